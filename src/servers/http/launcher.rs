use std::net::SocketAddr;
use std::sync::Arc;

use derive_more::{Constructor, Display};
use futures::{FutureExt as _, TryFutureExt as _};

use super::check::check_builder;
use super::handle::Handle;
use super::v1::routes::router;
use crate::core::Tracker;
use crate::servers::registar::FnSpawnServiceHeathCheck;
use crate::servers::service;

#[derive(Constructor, Clone, Debug, Display)]
#[display(fmt = "intended_address: {addr}, with tracker, and  {}", "self.have_tls()")]
pub struct Launcher {
    pub tracker: Arc<Tracker>,
    pub addr: SocketAddr,
    pub tls: Option<axum_server::tls_rustls::RustlsConfig>,
}

impl Launcher {
    fn have_tls(&self) -> String {
        match self.tls {
            Some(_) => "some",
            None => "none",
        }
        .to_string()
    }
}

impl service::Launcher<Handle> for Launcher {
    fn start(self) -> Result<(service::TaskFuture<'static, (), service::Error>, Handle, FnSpawnServiceHeathCheck), service::Error> {
        let handle = Handle::default();

        let running: service::TaskFuture<'_, (), service::Error> = {
            let listener = std::net::TcpListener::bind(self.addr).map_err(|e| service::Error::UnableToBindToSocket {
                addr: self.addr,
                err: e.into(),
            })?;

            let addr = listener
                .local_addr()
                .map_err(|e| service::Error::UnableToGetLocalAddress { err: e.into() })?;

            let make_service = router(self.tracker, addr).into_make_service_with_connect_info::<std::net::SocketAddr>();

            match self.tls.clone() {
                Some(tls) => crate::servers::custom_axum_server::from_tcp_rustls_with_timeouts(listener, tls)
                    .handle(handle.axum_handle.clone())
                    .serve(make_service)
                    .map_err(|e| service::Error::UnableToServe { err: e.into() })
                    .boxed(),

                None => crate::servers::custom_axum_server::from_tcp_with_timeouts(listener)
                    .handle(handle.axum_handle.clone())
                    .serve(make_service)
                    .map_err(|e| service::Error::UnableToServe { err: e.into() })
                    .boxed(),
            }
        };

        Ok((running, handle, check_builder))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use privateer_tracker_test_helpers::configuration::ephemeral;

    use crate::bootstrap::app::tracker;
    use crate::bootstrap::jobs::make_rust_tls;
    use crate::servers::http::launcher::Launcher;
    use crate::servers::{registar, service};

    #[tokio::test]
    async fn it_should_be_able_to_start_and_stop() {
        let cfg = Arc::new(ephemeral());
        let tracker = tracker(&cfg).await;
        let config = &cfg.http_trackers[0];

        let bind_to = config.bind_address.parse().expect("valid bind address");

        let tls = make_rust_tls(config.https_only, &config.tls_cert_path, &config.tls_key_path)
            .await
            .map(|tls| tls.expect("tls config failed"));

        let registar = registar::Registar::default();

        let stopped = service::Service::new(Launcher::new(tracker, bind_to, tls));

        let started = stopped.start().expect("it should start the server");
        started
            .reg_form(registar.give_form())
            .await
            .expect("it should register");

        let stopped = started.stop().await.expect("it should stop the server");

        drop(stopped);
    }
}
