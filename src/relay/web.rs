//! HTTP surface of the relay, independent of any server framework.
//!
//! [`RelayWebApp::handle`] maps a [`WebRequest`] to a [`WebResponse`]; the
//! esp-idf HTTP server binding only copies bytes in and out.
//!
//! | Route            | Method | Response                                  |
//! |------------------|--------|-------------------------------------------|
//! | `/`              | GET    | config page (HTML)                        |
//! | `/save`          | POST   | persist + reconfigure, 302 to `/`         |
//! | `/status`        | GET    | `{connected,bleName,svcUUID,chrUUID,msg}` |
//! | `/led?state=`    | POST   | `{ok,msg}`                                |
//! | `/discover`      | GET    | `{"list":[...]}`                          |

use log::{info, warn};
use serde::Serialize;

use super::command::LedCommand;
use super::config::{KEY_BLE_NAME, KEY_CHR_UUID, KEY_SVC_UUID, RelayConfig};
use super::link::{BleCentralPort, RelayLink};
use crate::app::ports::StoragePort;
use crate::error::RelayError;

const CONTENT_HTML: &str = "text/html; charset=utf-8";
const CONTENT_TEXT: &str = "text/plain";
const CONTENT_JSON: &str = "application/json";

const MSG_READY: &str = "BLE is connected, ready to write.";
const MSG_RECONNECTING: &str = "Not connected. ESP32 is trying to reconnect.";
const MSG_WRITE_OK: &str = "Write succeeded.";
const MSG_WRITE_FAILED: &str = "Write failed (not connected?).";

// ───────────────────────────────────────────────────────────────
// Request / response
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRequest {
    pub method: Method,
    pub path: String,
    pub query: String,
    pub body: String,
}

impl WebRequest {
    /// Split `uri` at the first `?` into path and query.
    pub fn new(method: Method, uri: &str, body: impl Into<String>) -> Self {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
        Self {
            method,
            path: path.to_owned(),
            query: query.to_owned(),
            body: body.into(),
        }
    }

    /// Form argument: urlencoded body first, then the query string.
    pub fn arg(&self, key: &str) -> Option<String> {
        form_value(&self.body, key).or_else(|| form_value(&self.query, key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl WebResponse {
    fn new(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::new(status, CONTENT_JSON, body),
            Err(e) => {
                warn!("[Web] JSON encode failed: {}", e);
                Self::new(500, CONTENT_JSON, r#"{"msg":"Internal error"}"#)
            }
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// ───────────────────────────────────────────────────────────────
// JSON bodies
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusBody<'a> {
    connected: bool,
    #[serde(rename = "bleName")]
    ble_name: &'a str,
    #[serde(rename = "svcUUID")]
    svc_uuid: String,
    #[serde(rename = "chrUUID")]
    chr_uuid: String,
    msg: &'static str,
}

#[derive(Serialize)]
struct WriteBody {
    ok: bool,
    msg: &'static str,
}

#[derive(Serialize)]
struct MsgBody {
    msg: &'static str,
}

#[derive(Serialize)]
struct DiscoverBody {
    list: Vec<String>,
}

// ───────────────────────────────────────────────────────────────
// Application
// ───────────────────────────────────────────────────────────────

pub struct RelayWebApp<C, S> {
    link: RelayLink<C>,
    storage: S,
}

impl<C: BleCentralPort, S: StoragePort> RelayWebApp<C, S> {
    /// Load the persisted target and wrap `central` in a link to it.
    pub fn new(central: C, storage: S) -> Self {
        let config = RelayConfig::load(&storage);
        Self {
            link: RelayLink::new(central, config),
            storage,
        }
    }

    pub fn link(&self) -> &RelayLink<C> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut RelayLink<C> {
        &mut self.link
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Loop body: keep the BLE link up.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        self.link.ensure_connected(now_ms)
    }

    /// A byte from the serial console. Non-command bytes are ignored.
    pub fn serial_byte(&mut self, b: u8) -> Option<Result<(), RelayError>> {
        let cmd = LedCommand::from_serial_byte(b)?;
        Some(self.link.write_command(cmd))
    }

    pub fn handle(&mut self, req: &WebRequest) -> WebResponse {
        match (req.path.as_str(), req.method) {
            ("/", Method::Get) => self.index(),
            ("/save", _) => self.save(req),
            ("/status", Method::Get) => self.status(),
            ("/led", _) => self.led(req),
            ("/discover", Method::Get) => self.discover(),
            ("/" | "/status" | "/discover", _) => WebResponse::new(405, CONTENT_TEXT, "Method Not Allowed"),
            _ => WebResponse::new(404, CONTENT_TEXT, "Not Found"),
        }
    }

    fn index(&self) -> WebResponse {
        let cfg = self.link.config();
        let page = INDEX_HTML
            .replace("%BLE_NAME%", &html_escape(cfg.target_name()))
            .replace("%SVC_UUID%", &cfg.service().to_string())
            .replace("%CHR_UUID%", &cfg.characteristic().to_string());
        WebResponse::new(200, CONTENT_HTML, page)
    }

    fn save(&mut self, req: &WebRequest) -> WebResponse {
        if req.method != Method::Post {
            return WebResponse::new(405, CONTENT_TEXT, "Method Not Allowed");
        }
        let fields = [KEY_BLE_NAME, KEY_SVC_UUID, KEY_CHR_UUID].map(|k| req.arg(k).unwrap_or_default());
        if fields.iter().any(|v| v.trim().is_empty()) {
            return WebResponse::new(400, CONTENT_TEXT, "Missing parameters");
        }

        let config = match RelayConfig::new(&fields[0], &fields[1], &fields[2]) {
            Ok(c) => c,
            Err(e) => {
                warn!("[Web] /save rejected: {}", e);
                return WebResponse::new(400, CONTENT_TEXT, format!("Invalid parameters: {e}"));
            }
        };

        if let Err(e) = config.save(&mut self.storage) {
            warn!("[Web] /save persist failed: {}", e);
            return WebResponse::new(500, CONTENT_TEXT, "Save failed");
        }
        info!("[Web] saved target '{}'", config.target_name());
        self.link.reconfigure(config);

        let mut resp = WebResponse::new(302, CONTENT_TEXT, "Saved.");
        resp.headers.push(("Location", "/".to_owned()));
        resp
    }

    fn status(&self) -> WebResponse {
        let cfg = self.link.config();
        let connected = self.link.is_ready();
        WebResponse::json(
            200,
            &StatusBody {
                connected,
                ble_name: cfg.target_name(),
                svc_uuid: cfg.service().to_string(),
                chr_uuid: cfg.characteristic().to_string(),
                msg: if connected { MSG_READY } else { MSG_RECONNECTING },
            },
        )
    }

    fn led(&mut self, req: &WebRequest) -> WebResponse {
        if req.method != Method::Post {
            return WebResponse::json(405, &MsgBody { msg: "Method Not Allowed" });
        }
        let Some(cmd) = req.arg("state").as_deref().and_then(LedCommand::from_state) else {
            return WebResponse::json(400, &MsgBody { msg: "Use state=on/off/toggle" });
        };

        let ok = self.link.write_command(cmd).is_ok();
        WebResponse::json(
            200,
            &WriteBody {
                ok,
                msg: if ok { MSG_WRITE_OK } else { MSG_WRITE_FAILED },
            },
        )
    }

    fn discover(&mut self) -> WebResponse {
        WebResponse::json(200, &DiscoverBody { list: self.link.discover() })
    }
}

// ───────────────────────────────────────────────────────────────
// Encoding helpers
// ───────────────────────────────────────────────────────────────

/// Look up `key` in an `application/x-www-form-urlencoded` string.
pub fn form_value(encoded: &str, key: &str) -> Option<String> {
    encoded
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (url_decode(k) == key).then(|| url_decode(v))
        })
        .next()
}

/// Decode `+` and `%XX`. Malformed escapes pass through literally;
/// invalid UTF-8 is replaced.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => match bytes.get(i + 1..i + 3).and_then(|h| hex_pair(h[0], h[1])) {
                Some(b) => {
                    out.push(b);
                    i += 2;
                }
                None => out.push(b'%'),
            },
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let h = (hi as char).to_digit(16)?;
    let l = (lo as char).to_digit(16)?;
    Some((h * 16 + l) as u8)
}

pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!doctype html><html><head>
<meta charset="utf-8"/><meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Thermoband BLE Relay</title>
<style>
body{font-family:system-ui,sans-serif;margin:24px;max-width:720px}
label{display:block;margin:12px 0 6px}
input{width:100%;padding:10px;font-size:16px;box-sizing:border-box}
button{padding:10px 14px;font-size:16px;margin:6px 6px 6px 0}
.card{padding:16px;border:1px solid #ddd;border-radius:12px;margin-bottom:16px}
.ok{color:#0a0}.bad{color:#a00}
</style></head><body>
<h1>BLE Relay</h1>
<div class="card">
  <form method="POST" action="/save">
    <label>Target BLE name</label>
    <input name="bleName" value="%BLE_NAME%" required/>
    <label>Service UUID</label>
    <input name="svcUUID" value="%SVC_UUID%" required/>
    <label>Characteristic UUID (writable)</label>
    <input name="chrUUID" value="%CHR_UUID%" required/>
    <button type="submit">Save &amp; connect</button>
  </form>
</div>
<div class="card">
  <div id="status">Loading...</div>
  <button onclick="send('on')">LED ON</button>
  <button onclick="send('off')">LED OFF</button>
  <button onclick="send('toggle')">TOGGLE</button>
  <button onclick="refresh()">Refresh</button>
  <button onclick="discover()">Discover</button>
</div>
<script>
function refresh(){
  fetch('/status').then(r=>r.json()).then(j=>{
    const s=document.getElementById('status');
    s.innerHTML='';
    const b=document.createElement('b');
    b.className=j.connected?'ok':'bad';
    b.textContent=j.connected?'connected':'disconnected';
    s.append('BLE: ',b,' | '+j.bleName+' | '+j.msg);
  }).catch(_=>{document.getElementById('status').textContent='Failed to fetch status';});
}
function send(state){
  fetch('/led?state='+state,{method:'POST'}).then(r=>r.json())
    .then(j=>{alert(j.msg);refresh();}).catch(_=>alert('Request failed'));
}
function discover(){
  fetch('/discover').then(r=>r.json())
    .then(j=>alert(j.list.length?j.list.join('\n'):'No services found.'))
    .catch(_=>alert('Discover failed'));
}
refresh();
</script>
</body></html>
"#;
