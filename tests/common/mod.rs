#![allow(dead_code)]

pub mod in_process {
    use yawf::context::ResponseWriter;
    use yawf::request::Request;
    use yawf::{App, Server};

    /// Freeze `server` and run a single request through it.
    pub fn serve(server: Server, method: &str, target: &str) -> ResponseWriter {
        server
            .into_app()
            .serve(Request::new(method, target))
            .unwrap()
    }

    pub fn body_text(out: &ResponseWriter) -> String {
        String::from_utf8_lossy(out.body()).into_owned()
    }

    pub fn body_json(out: &ResponseWriter) -> serde_json::Value {
        serde_json::from_slice(out.body()).unwrap()
    }

    pub fn get(app: &App, target: &str) -> ResponseWriter {
        app.serve(Request::new("GET", target)).unwrap()
    }
}

pub mod test_server {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::Once;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use yawf::{Server, ServerError, ShutdownHandle};

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// A server running on a background thread; stopped when dropped.
    pub struct RunningServer {
        pub addr: SocketAddr,
        pub shutdown: ShutdownHandle,
        thread: Option<JoinHandle<Result<(), ServerError>>>,
    }

    impl RunningServer {
        /// Stop the server and wait for `run` to return.
        pub fn stop(mut self) -> Result<(), ServerError> {
            self.shutdown.stop();
            match self.thread.take() {
                Some(thread) => thread.join().expect("server thread panicked"),
                None => Ok(()),
            }
        }
    }

    impl Drop for RunningServer {
        fn drop(&mut self) {
            self.shutdown.stop();
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }

    /// A free loopback address. The temporary listener is dropped before the
    /// server binds the port in `run`.
    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    /// Listen on a free port and run `server` on a background thread.
    pub fn start(server: Server) -> RunningServer {
        start_with_delay(server, Duration::ZERO)
    }

    pub fn start_with_delay(mut server: Server, graceful_delay: Duration) -> RunningServer {
        server.set_graceful_delay(graceful_delay);
        server.set_address(free_addr().to_string());
        server.listen().unwrap();
        run_listening(server)
    }

    /// Run a server whose `listen` already succeeded.
    pub fn run_listening(server: Server) -> RunningServer {
        setup_may_runtime();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run());
        wait_ready(addr);
        RunningServer {
            addr,
            shutdown,
            thread: Some(thread),
        }
    }

    fn wait_ready(addr: SocketAddr) {
        for _ in 0..200 {
            if TcpStream::connect(addr).is_ok() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("server at {addr} not ready");
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let Ok(mut stream) = TcpStream::connect(addr) else {
            return String::new();
        };
        if stream.write_all(req.as_bytes()).is_err() {
            return String::new();
        }
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Status, lowercased headers and body of a raw HTTP/1.1 response.
    pub fn parse_response(resp: &str) -> (u16, Vec<(String, String)>, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        (status, headers, body.to_string())
    }
}
