//! Form round-trip: a GET serves the form, the POST echoes the decoded
//! fields back, and query-string parameters work on the GET side too.
//!
//! Run with `cargo run --example form_echo`, then open
//! <http://127.0.0.1:8080/form>.

use solo_web::{
    limits::ServerLimits, Connection, Method, Server, SystemClock, TcpServer, UrlParamResult,
    UrlParams,
};

const FORM_PAGE: &str = "<form method=\"post\" action=\"/form\">\
    <input name=\"user\"> <input name=\"color\">\
    <button>send</button></form>";

fn str_of(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).unwrap_or("<non-utf8>")
}

fn form(conn: &mut Connection<solo_web::TcpByteSource, SystemClock>, method: Method, tail: &[u8], _: bool) {
    if conn.http_success("text/html", None).is_err() {
        return;
    }
    if method == Method::Head {
        return;
    }

    match method {
        Method::Post => {
            // Stream the body's fields as they decode.
            let (mut name, mut value) = ([0u8; 32], [0u8; 64]);
            loop {
                let more = conn.read_post_param(&mut name, &mut value);
                let line = format!("<p>{} = {}</p>", str_of(&name), str_of(&value));
                if conn.print(&line).is_err() {
                    return;
                }
                if !more {
                    break;
                }
            }
        }
        _ => {
            // Query-string parameters, if any, then the form itself.
            let mut params = UrlParams::new(tail);
            let (mut name, mut value) = ([0u8; 32], [0u8; 64]);
            while params.next_param(&mut name, &mut value) != UrlParamResult::EndOfParams {
                let line = format!("<p>{} = {}</p>", str_of(&name), str_of(&value));
                if conn.print(&line).is_err() {
                    return;
                }
            }
            let _ = conn.print(FORM_PAGE);
        }
    }
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().init();

    let mut server: TcpServer = Server::new("", ServerLimits::default(), SystemClock::default());
    server.add_command("form", form);
    server.set_failure_command(
        |conn: &mut Connection<_, _>, _: Method, path: &[u8], _: bool| {
            tracing::warn!(path = %String::from_utf8_lossy(path), "unroutable request");
            let _ = conn.http_fail();
        },
    );

    let addr = "127.0.0.1:8080".parse().unwrap();
    let listener = TcpServer::bind(addr)?;
    tracing::info!(%addr, "listening");
    server.run(&listener)
}
