use crate::model::post_board::PostBoard;
use log::{debug, error, info, warn};
use quote_common::command::{CREATE_POST, FETCH_POSTS};
use quote_common::model::now_millis;
use quote_common::net::DEFAULT_FETCH_LIMIT;
use quote_common::{Command, QuoteError, Reply};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// TCP request server for the mock posts API.
///
/// Each accepted connection carries one JSON `Command` line and receives one
/// JSON `Reply` line. Connections are served on their own threads so a slow or
/// misbehaving client never blocks the accept loop.
pub struct RequestServer {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
    board: Arc<Mutex<PostBoard>>,
}

impl RequestServer {
    /// Bind a new server to `bind_addr` (e.g., `0.0.0.0:8080`).
    pub fn new(bind_addr: &str, board: Arc<Mutex<PostBoard>>) -> Result<Self, QuoteError> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket, board })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr, QuoteError> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking accept loop. Per-connection failures are logged and never end the loop.
    pub fn serve(self) -> Result<(), QuoteError> {
        info!("Posts API is started on {}", self.socket.local_addr()?);

        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => {
                    let board = Arc::clone(&self.board);
                    thread::spawn(move || {
                        let peer = stream.peer_addr().ok();
                        if let Err(e) = handle_connection(stream, &board) {
                            warn!("Request from {:?} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }
}

fn handle_connection(stream: TcpStream, board: &Mutex<PostBoard>) -> Result<(), QuoteError> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let reply = match serde_json::from_str::<Command>(line.trim()) {
        Ok(cmd) => {
            debug!("Received command {:?}", cmd);
            handle_command(board, cmd)?
        }
        Err(e) => Reply::error(format!("JSON error: {}", e)),
    };

    let mut stream = stream;
    stream.write_all(&reply.to_json_line()?)?;
    stream.flush()?;
    Ok(())
}

/// Executes one command against the board.
pub fn handle_command(board: &Mutex<PostBoard>, cmd: Command) -> Result<Reply, QuoteError> {
    let reply = match cmd.header.as_str() {
        FETCH_POSTS => {
            let limit = cmd.limit.unwrap_or(DEFAULT_FETCH_LIMIT);
            Reply::ok_posts(board.lock()?.list(limit))
        }
        CREATE_POST => match cmd.post {
            Some(draft) => {
                let post = board.lock()?.create(draft, now_millis());
                info!("Created post {}", post.id);
                Reply::ok_created(post)
            }
            None => Reply::error("CREATE_POST without a post"),
        },
        other => Reply::error(format!("Unknown command: {}", other)),
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_common::PostDraft;
    use quote_common::command::STATUS_ERROR;

    fn board() -> Mutex<PostBoard> {
        Mutex::new(PostBoard::seeded(now_millis()))
    }

    #[test]
    fn fetch_returns_limited_posts() {
        let reply = handle_command(&board(), Command::new_fetch(2)).unwrap();
        assert_eq!(reply.posts.len(), 2);
    }

    #[test]
    fn create_stores_the_post() {
        let board = board();
        let draft = PostDraft {
            title: "Life".to_string(),
            body: "Keep going.".to_string(),
            user_id: 1,
        };
        let reply = handle_command(&board, Command::new_create(draft)).unwrap();
        let created = reply.created.unwrap();
        assert_eq!(created.body, "Keep going.");
        assert!(board.lock().unwrap().ids().contains(&created.id));
    }

    #[test]
    fn unknown_header_is_rejected() {
        let cmd = Command {
            header: "DELETE".to_string(),
            limit: None,
            post: None,
        };
        let reply = handle_command(&board(), cmd).unwrap();
        assert_eq!(reply.status, STATUS_ERROR);
    }

    #[test]
    fn serves_fetch_over_tcp() {
        let server = RequestServer::new("127.0.0.1:0", Arc::new(board())).unwrap();
        let addr = server.local_addr().unwrap();
        thread::spawn(move || server.serve());

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(&Command::new_fetch(3).to_json_line().unwrap())
            .unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        let reply: Reply = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(reply.posts.len(), 3);
    }

    #[test]
    fn malformed_request_gets_error_reply_and_server_keeps_running() {
        let server = RequestServer::new("127.0.0.1:0", Arc::new(board())).unwrap();
        let addr = server.local_addr().unwrap();
        thread::spawn(move || server.serve());

        for _ in 0..2 {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"not json\n").unwrap();
            let mut line = String::new();
            BufReader::new(stream).read_line(&mut line).unwrap();
            let reply: Reply = serde_json::from_str(line.trim()).unwrap();
            assert_eq!(reply.status, STATUS_ERROR);
        }
    }
}
