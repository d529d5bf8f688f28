//! A connected simulator session.

use std::net::{TcpListener, TcpStream, ToSocketAddrs};

use log::info;

use ctc_world::census::Census;

use crate::error::TransportResult;
use crate::frame;
use crate::protocol::{self, CommandBundle};

/// One live exchange with the simulator client.
///
/// The coordinator is the server side: it binds, accepts a single client,
/// then strictly alternates census-in / commands-out until either side
/// drops.
pub struct Session {
    stream: TcpStream,
}

impl Session {
    /// Bind `addr` and block until the simulator connects.
    pub fn accept(addr: impl ToSocketAddrs) -> TransportResult<Self> {
        let listener = TcpListener::bind(addr)?;
        info!(
            "waiting for simulator client on {}",
            listener.local_addr()?
        );
        let (stream, peer) = listener.accept()?;
        info!("simulator connected from {peer}");
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Receive and decode one census frame.
    pub fn receive_census(&mut self) -> TransportResult<Census> {
        let payload = frame::read_frame(&mut self.stream)?;
        protocol::decode_census(&payload)
    }

    /// Encode and send one command bundle.
    pub fn send_commands(&mut self, bundle: &CommandBundle) -> TransportResult<()> {
        let payload = bundle.encode()?;
        frame::write_frame(&mut self.stream, &payload)
    }
}
