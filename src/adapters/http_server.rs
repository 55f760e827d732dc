//! esp-idf HTTP server binding for [`RelayWebApp`].
//!
//! Every route is registered for GET and POST and forwarded to
//! [`RelayWebApp::handle`], which owns method checks and status codes.
//! Unregistered paths get the server's own 404.

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use esp_idf_svc::http::{Headers, Method};
use esp_idf_svc::http::server::{Configuration as HttpConfiguration, EspHttpConnection, EspHttpServer, Request};
use esp_idf_svc::io::{Read, Write};
use log::warn;

use crate::app::ports::StoragePort;
use crate::relay::link::BleCentralPort;
use crate::relay::web::{self, RelayWebApp, WebRequest};

const ROUTES: [&str; 5] = ["/", "/save", "/status", "/led", "/discover"];
const MAX_HTTP_BODY: usize = 1024;

fn read_request_body(req: &mut Request<&mut EspHttpConnection<'_>>) -> anyhow::Result<String> {
    let len = req.content_len().unwrap_or(0) as usize;
    if len > MAX_HTTP_BODY {
        return Err(anyhow!("request body too large"));
    }
    let mut body = vec![0_u8; len];
    if len > 0 {
        req.read_exact(&mut body)?;
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

pub fn start_http_server<C, S>(app: Arc<Mutex<RelayWebApp<C, S>>>) -> anyhow::Result<EspHttpServer<'static>>
where
    C: BleCentralPort + Send + 'static,
    S: StoragePort + Send + 'static,
{
    let conf = HttpConfiguration {
        stack_size: 10 * 1024,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    for path in ROUTES {
        for (method, web_method) in [(Method::Get, web::Method::Get), (Method::Post, web::Method::Post)] {
            let app = app.clone();
            server.fn_handler::<anyhow::Error, _>(path, method, move |mut req| {
                let body = read_request_body(&mut req)?;
                let request = WebRequest::new(web_method, req.uri(), body);

                let response = app
                    .lock()
                    .map_err(|_| anyhow!("relay state poisoned"))?
                    .handle(&request);
                if response.status >= 400 {
                    warn!("[Web] {} -> {}", request.path, response.status);
                }

                let mut headers: Vec<(&str, &str)> = vec![("Content-Type", response.content_type)];
                headers.extend(response.headers.iter().map(|(k, v)| (*k, v.as_str())));
                req.into_response(response.status, None, &headers)?
                    .write_all(response.body.as_bytes())?;
                Ok(())
            })?;
        }
    }

    log::info!("[Web] HTTP server started.");
    Ok(server)
}
