//! Fake Ethernet bus adapter: answers link negotiation and echoes reads.
//!
//! Every RS-form request sent to a device id in 1..=3 is answered by that
//! device: reads echo the request payload padded with zeros to four bytes,
//! writes are acknowledged empty. Useful for trying the CLI without hardware.
//!
//! Run with:
//!   cargo run --example fake-adapter
//!
//! In another terminal:
//!   cargo run --features cli -- read --tcp 127.0.0.1:6001 --cmd 0x30 --len 4
//!   cargo run --features cli -- scan --tcp 127.0.0.1:6001 --cmd 0x21 --len 4 --from 1 --to 5

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use actlink::frame::{
    pack, unpack, Address, Frame, Rw, Variant, HOST_ID, NEGOTIATE_CMD, WILDCARD_ID,
};

const DEVICES: std::ops::RangeInclusive<u8> = 1..=3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(("127.0.0.1", actlink::client::DEFAULT_TCP_PORT))?;
    eprintln!("Fake adapter on {}", listener.local_addr()?);

    for stream in listener.incoming() {
        let stream = stream?;
        eprintln!("Host connected: {}", stream.peer_addr()?);
        if let Err(e) = serve(stream) {
            eprintln!("Host disconnected: {e}");
        }
    }
    Ok(())
}

fn serve(mut stream: TcpStream) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header)?;
        let mut wire = header.to_vec();
        wire.resize(usize::from(header[2] & 0x7F) + 5, 0);
        stream.read_exact(&mut wire[4..])?;

        let request = match unpack(&wire, Variant::Rs) {
            Ok(frame) => frame,
            Err(e) => {
                eprintln!("Dropping bad request: {e}");
                continue;
            }
        };
        let Address::Rs { to, .. } = request.address else {
            continue;
        };

        let responders: Vec<u8> = match (to, request.cmd) {
            (WILDCARD_ID, NEGOTIATE_CMD) => vec![*DEVICES.start()],
            (WILDCARD_ID, _) => DEVICES.collect(),
            (id, _) if DEVICES.contains(&id) => vec![id],
            _ => Vec::new(),
        };

        for id in responders {
            let data = match (request.cmd, request.rw) {
                (NEGOTIATE_CMD, _) => vec![0],
                (_, Rw::Write) => Vec::new(),
                (_, Rw::Read) => {
                    let mut data = request.data.to_vec();
                    data.resize(4, 0);
                    data
                }
            };
            let reply = Frame::new(
                Address::Rs {
                    from: id,
                    to: HOST_ID,
                },
                request.rw,
                request.cmd,
                data,
            );
            stream.write_all(&pack(&reply)?)?;
        }
    }
}
