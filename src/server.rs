use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument};

use crate::commands::executable::Executable;
use crate::commands::{Command, CommandParserError};
use crate::connection::Connection;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

pub async fn run(port: u16) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    let store = Store::new();

    info!("Server listening on {}", listener.local_addr()?);

    loop {
        let (socket, client_address) = listener.accept().await?;
        let store = store.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            // A worker's failure is its own; the listener and the other
            // workers never observe it.
            if let Err(e) = handle_connection(socket, client_address, store).await {
                error!("Connection error: {}", e);
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, store),
    fields(client_address = %client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream);

    while let Some(frame) = conn.read_frame().await? {
        debug!("Received frame from client: {:?}", frame);

        let response = match Command::try_from(frame) {
            Ok(cmd) => cmd.exec(store.clone())?,
            // Arity and integer-format mistakes are the client's problem,
            // not the stream's: reply and keep serving. Anything else means
            // the inbound bytes cannot be trusted and the connection ends.
            Err(err) => match err.downcast_ref::<CommandParserError>() {
                Some(parse_err) if parse_err.is_recoverable() => {
                    Frame::Error(parse_err.to_string())
                }
                _ => return Err(err),
            },
        };

        debug!("Sending response to client: {:?}", response);
        conn.write_frame(&response).await?;
    }

    info!("Connection closed");
    Ok(())
}
