use std::net::SocketAddr;

use derive_more::{Constructor, Display};
use futures::{FutureExt as _, TryFutureExt as _};

use super::check::check_builder;
use super::handle::Handle;
use super::routes::router;
use crate::servers::registar::{FnSpawnServiceHeathCheck, ServiceRegistry};
use crate::servers::service;

#[derive(Clone, Constructor, Debug, Display)]
#[display(fmt = "intended_address: {addr}")]
pub struct Launcher {
    pub addr: SocketAddr,
    pub registry: ServiceRegistry,
}

impl service::Launcher<Handle> for Launcher {
    fn start(self) -> Result<(service::TaskFuture<'static, (), service::Error>, Handle, FnSpawnServiceHeathCheck), service::Error> {
        let handle = Handle::default();

        let task: service::TaskFuture<'_, (), service::Error> = {
            let listener = std::net::TcpListener::bind(self.addr).map_err(|e| service::Error::UnableToBindToSocket {
                addr: self.addr,
                err: e.into(),
            })?;

            let addr = listener
                .local_addr()
                .map_err(|e| service::Error::UnableToGetLocalAddress { err: e.into() })?;

            let router = router(self.registry, addr);
            let make_service = router.into_make_service_with_connect_info::<SocketAddr>();

            axum_server::from_tcp(listener)
                .handle(handle.axum_handle.clone())
                .serve(make_service)
                .map_err(|e| service::Error::UnableToServe { err: e.into() })
                .boxed()
        };

        Ok((task, handle, check_builder))
    }
}
