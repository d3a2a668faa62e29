//! Minimal server: every request to `/` gets a greeting.
//!
//! Run with `cargo run --example hello_world`, then open
//! <http://127.0.0.1:8080/>.

use solo_web::{limits::ServerLimits, Connection, Method, Server, SystemClock, TcpServer};

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().init();

    let mut server: TcpServer = Server::new("", ServerLimits::default(), SystemClock::default());

    server.set_default_command(
        |conn: &mut Connection<_, _>, method: Method, _: &[u8], _: bool| {
            if conn.http_success("text/html", None).is_err() {
                return;
            }
            if method != Method::Head {
                let _ = conn.print("<h1>Hello, world!</h1>");
            }
        },
    );

    let addr = "127.0.0.1:8080".parse().unwrap();
    let listener = TcpServer::bind(addr)?;
    tracing::info!(%addr, "listening");
    server.run(&listener)
}
