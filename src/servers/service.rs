//! Generic lifecycle for a started/stopped network service (C13 transport
//! shell): every concrete server (HTTP, UDP, health check) plugs into this
//! state machine instead of rolling its own start/stop bookkeeping.
use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, instrument, trace};

use super::registar::{FnSpawnServiceHeathCheck, ServiceRegistration, ServiceRegistrationForm};
use super::signals::Halted;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Failed to bind to socket: {addr}, with error: {err}")]
    UnableToBindToSocket { addr: SocketAddr, err: Arc<std::io::Error> },
    #[error("Failed to get Local Address from Socket: {err:?}")]
    UnableToGetLocalAddress { err: Arc<std::io::Error> },
    #[error("Failed to get listening address.")]
    UnableToGetListeningAddress {},
    #[error("Failed to serve service: {err:?}")]
    UnableToServe { err: Arc<std::io::Error> },
    #[error("Failed to send ServiceRegistration: {err:?}")]
    UnableToSendRegistrationMessage { err: ServiceRegistration },
    #[error("Failed to send Halted: {err:?}")]
    UnableToSendHaltingMessage { err: Halted },
    #[error("Failed to join task when stopping: {err:?}")]
    UnableToJoinStoppingService { err: Arc<JoinError> },
    #[error("Failed to join the tokio task: {err:?}")]
    UnableJoinTokioTask { err: Arc<JoinError> },
}

pub type AddrFuture<'a> = BoxFuture<'a, Option<SocketAddr>>;

pub type TaskFuture<'a, T, E> = BoxFuture<'a, Result<T, E>>;
pub type TaskHandle<T, E> = JoinHandle<Result<T, E>>;

pub trait Handle: Debug + Default + Send + 'static {
    /// Stops the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the halt signal could not be delivered.
    fn stop(self) -> Result<(), Error>;

    fn listening(&self) -> AddrFuture<'_>;
}

pub trait Launcher<H>: Clone + Debug + Display + Send + 'static
where
    H: Handle,
{
    /// Starts the service.
    ///
    /// # Errors
    ///
    /// Returns an error if the service fails to bind or the launching task
    /// itself fails.
    fn start(self) -> Result<(TaskFuture<'static, (), Error>, H, FnSpawnServiceHeathCheck), Error>;
}

/// A service instance controller: starts, stops, and tracks whether a
/// service is `running` or `stopped`.
#[allow(clippy::module_name_repetitions)]
pub struct Service<S, L, H>
where
    L: Launcher<H> + Send + 'static,
    H: Handle,
    S: Debug,
{
    phantom: PhantomData<H>,
    pub state: S,
    launcher: L,
}

impl<S: Debug, L: Debug, H: Debug> Debug for Service<S, L, H>
where
    L: Launcher<H> + Send + 'static,
    H: Handle,
    S: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service").field("state", &self.state).finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Stopped {}

pub struct Started<H>
where
    H: Handle,
{
    task: TaskHandle<(), Error>,
    pub handle: H,
    check_fn: FnSpawnServiceHeathCheck,
}

impl<H: Handle> Started<H> {
    #[instrument(skip(task))]
    pub fn new(task: TaskFuture<'static, (), Error>, handle: H, check_fn: FnSpawnServiceHeathCheck) -> Self {
        debug!("spawning the service task in tokio");
        let task: TaskHandle<(), Error> = tokio::task::spawn(task);

        Self { task, handle, check_fn }
    }
}

impl<H: Debug> Debug for Started<H>
where
    H: Handle,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Started")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<H: Handle, L: Launcher<H> + Send + 'static> Service<Stopped, L, H> {
    #[must_use]
    #[instrument(ret, fields(launcher = %launcher))]
    pub fn new(launcher: L) -> Self {
        Self {
            phantom: PhantomData,
            state: Stopped {},
            launcher,
        }
    }

    /// Starts the service and returns a controller in the `started` state.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying launcher fails.
    #[instrument(err, ret)]
    pub fn start(self) -> Result<Service<Started<H>, L, H>, Error> {
        trace!("starting the task");
        let (task, handle, check_fn) = self.launcher.clone().start()?;

        Ok(Service {
            phantom: PhantomData,
            state: Started::new(task, handle, check_fn),
            launcher: self.launcher,
        })
    }
}

impl<'a, H: Handle, L: Launcher<H> + Send + 'a> Service<Started<H>, L, H> {
    /// Returns the address this service is listening on.
    ///
    /// # Errors
    ///
    /// Returns an error if the service never reports a listening address.
    #[instrument(err, ret)]
    pub async fn listening(&self) -> Result<SocketAddr, Error> {
        self.state
            .handle
            .listening()
            .await
            .ok_or(Error::UnableToGetListeningAddress {})
    }

    /// Registers this service for health checking on the supplied form.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is unavailable or the registration
    /// message could not be sent.
    #[instrument(err, ret, skip(form))]
    pub async fn reg_form(&self, form: ServiceRegistrationForm) -> Result<(), Error> {
        let addr = self.listening().await?;

        form.send(ServiceRegistration::new(addr, self.state.check_fn))
            .map_err(|err| Error::UnableToSendRegistrationMessage { err })
    }

    /// Returns the running task along with its handle. When the task
    /// completes, the returned join handle resolves to a controller in the
    /// stopped state.
    #[instrument()]
    pub fn run(self) -> (TaskHandle<Service<Stopped, L, H>, Error>, H) {
        let task = tokio::task::spawn(async move {
            self.state.task.await.map_err(|e| Error::UnableJoinTokioTask { err: e.into() })??;

            Ok(Service {
                phantom: PhantomData,
                state: Stopped {},
                launcher: self.launcher,
            })
        });

        (task, self.state.handle)
    }

    /// Stops the service and returns a controller in the `stopped` state.
    ///
    /// # Errors
    ///
    /// Returns an error if the halt signal fails to send or the task ends
    /// with an error.
    #[instrument(err, ret)]
    pub async fn stop(self) -> Result<Service<Stopped, L, H>, Error> {
        self.state.handle.stop()?;
        self.state.task.await.map_err(|e| Error::UnableJoinTokioTask { err: e.into() })??;

        Ok(Service {
            phantom: PhantomData,
            state: Stopped {},
            launcher: self.launcher,
        })
    }
}
