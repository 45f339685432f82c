#![cfg(unix)]

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use actlink_client::{Client, ClientConfig, ClientError, Descriptor, Status};
use actlink_frame::{pack, unpack, Address, Frame, FrameDecoder, Rw, Variant, HOST_ID, WILDCARD_ID};
use actlink_transport::{Transport, TransportConfig};

const POS_TARGET: Descriptor = Descriptor::new(0x30).read(0, 4).write(4, 0);
const ECHO: Descriptor = Descriptor::new(0x40).read(1, 1);
const TEMPERATURE: Descriptor = Descriptor::new(0x21).read(2, 4);

fn client_pair(timeout: Duration) -> (Client, UnixStream) {
    let (local, remote) = UnixStream::pair().unwrap();
    let transport_config = TransportConfig {
        poll_interval: Duration::from_millis(10),
        ..TransportConfig::default()
    };
    let decoder = FrameDecoder::rs(1, HOST_ID);
    let transport = Transport::unix(local, Some(Box::new(decoder)), &transport_config).unwrap();
    let config = ClientConfig {
        timeout,
        ..ClientConfig::default()
    };
    (Client::new(transport, Variant::Rs, config), remote)
}

/// Read one RS-form request off the bus; `None` once the host hangs up.
fn next_request(stream: &mut UnixStream) -> Option<(Frame, Vec<u8>)> {
    let mut header = [0u8; 4];
    match stream.read_exact(&mut header) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return None,
        Err(err) => panic!("bus read failed: {err}"),
    }
    let len = usize::from(header[2] & 0x7F);
    let mut wire = header.to_vec();
    wire.resize(len + 5, 0);
    stream.read_exact(&mut wire[4..]).ok()?;
    let frame = unpack(&wire, Variant::Rs).unwrap();
    Some((frame, wire))
}

fn reply_from(id: u8, request: &Frame, data: &[u8]) -> Vec<u8> {
    let frame = Frame::new(
        Address::Rs {
            from: id,
            to: HOST_ID,
        },
        request.rw,
        request.cmd,
        data.to_vec(),
    );
    pack(&frame).unwrap().to_vec()
}

/// Run a scripted bus: every request goes to `handler`, whose output is written back.
fn spawn_bus<F>(mut stream: UnixStream, mut handler: F) -> JoinHandle<()>
where
    F: FnMut(&Frame, &[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    thread::spawn(move || {
        while let Some((request, wire)) = next_request(&mut stream) {
            for reply in handler(&request, &wire) {
                if stream.write_all(&reply).is_err() {
                    return;
                }
            }
        }
    })
}

#[test]
fn test_write_position_request_layout() {
    let (client, remote) = client_pair(Duration::from_secs(1));
    let (seen_tx, seen_rx) = mpsc::channel();
    let bus = spawn_bus(remote, move |request, wire| {
        seen_tx.send(wire.to_vec()).unwrap();
        vec![reply_from(1, request, &[])]
    });

    let reply = client
        .transact(Rw::Write, &POS_TARGET, &50.0f32.to_be_bytes(), None)
        .unwrap();
    assert_eq!(reply.status(), Status::Ok);
    assert!(reply.data().is_empty());

    let wire = seen_rx.recv().unwrap();
    assert_eq!(&wire[..8], &[0xAA, 0x01, 0x05, 0xB0, 0x42, 0x48, 0x00, 0x00]);
    assert_eq!(wire.len(), 10);

    client.close();
    bus.join().unwrap();
}

#[test]
fn test_reply_for_other_command_is_rejected() {
    let (client, remote) = client_pair(Duration::from_secs(1));
    let bus = spawn_bus(remote, |request, _| {
        let mut other = request.clone();
        other.cmd = 0x31;
        vec![reply_from(1, &other, &[0, 0, 0, 0])]
    });

    let err = client.transact(Rw::Read, &POS_TARGET, &[], None).unwrap_err();
    assert!(matches!(err, ClientError::Cmd { expected: 0x30, got: 0x31 }));
    assert_eq!(err.status(), Status::Cmd);
    assert_eq!(err.status().code(), -7);

    client.close();
    bus.join().unwrap();
}

#[test]
fn test_silent_device_times_out_on_schedule() {
    let (client, remote) = client_pair(Duration::from_millis(150));
    let bus = spawn_bus(remote, |_, _| Vec::new());

    let started = Instant::now();
    let err = client.transact(Rw::Read, &POS_TARGET, &[], None).unwrap_err();
    let elapsed = started.elapsed();
    assert_eq!(err.status(), Status::Timeout);
    assert!(elapsed >= Duration::from_millis(150), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(900), "returned late: {elapsed:?}");

    // Explicit per-call timeouts override the configured one.
    let started = Instant::now();
    client.send(Rw::Read, &POS_TARGET, &[]).unwrap();
    let err = client
        .pend(Rw::Read, &POS_TARGET, Some(Duration::from_millis(50)))
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_millis(50)));
    assert!(started.elapsed() < Duration::from_millis(600));

    client.close();
    bus.join().unwrap();
}

#[test]
fn test_concurrent_callers_get_their_own_replies() {
    let (client, remote) = client_pair(Duration::from_secs(2));
    let bus = spawn_bus(remote, |request, _| {
        vec![reply_from(1, request, &request.data)]
    });

    let client = Arc::new(client);
    let workers: Vec<_> = [0x10u8, 0x20]
        .into_iter()
        .map(|base| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for i in 0..25u8 {
                    let value = base + (i % 16);
                    let reply = client.transact(Rw::Read, &ECHO, &[value], None).unwrap();
                    assert_eq!(reply.data().as_ref(), &[value]);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    client.close();
    bus.join().unwrap();
}

#[test]
fn test_get_range_places_replies_by_id() {
    let (client, remote) = client_pair(Duration::from_millis(200));
    let (seen_tx, seen_rx) = mpsc::channel();
    let bus = spawn_bus(remote, move |request, _| {
        seen_tx.send(request.clone()).unwrap();
        // Device 2 is silent; 3 answers before 1; 9 is outside the range.
        vec![
            reply_from(3, request, &[0, 0, 0, 33]),
            reply_from(9, request, &[0, 0, 0, 99]),
            reply_from(1, request, &[0, 0, 0, 11]),
        ]
    });

    let slots = client.get_range(&TEMPERATURE, 1, 3).unwrap();
    let request = seen_rx.recv().unwrap();
    assert_eq!(request.address, Address::Rs { from: HOST_ID, to: WILDCARD_ID });
    assert_eq!(request.data.as_ref(), &[1, 3]);

    assert_eq!(slots.len(), 3);
    assert_eq!((slots[0].id, slots[0].status), (1, Status::Ok));
    assert_eq!(slots[0].data.as_ref(), &[0, 0, 0, 11]);
    assert_eq!((slots[1].id, slots[1].status), (2, Status::Timeout));
    assert!(slots[1].data.is_empty());
    assert_eq!((slots[2].id, slots[2].status), (3, Status::Ok));
    assert_eq!(slots[2].data.as_ref(), &[0, 0, 0, 33]);

    client.close();
    bus.join().unwrap();
}

#[test]
fn test_get_range_reports_nack_per_slot() {
    let (client, remote) = client_pair(Duration::from_millis(200));
    let bus = spawn_bus(remote, |request, _| {
        let nack = Frame::new(
            Address::Rs {
                from: 2,
                to: HOST_ID,
            },
            request.rw,
            request.cmd,
            vec![0x01],
        )
        .with_state(true);
        vec![
            reply_from(1, request, &[0, 0, 0, 1]),
            pack(&nack).unwrap().to_vec(),
        ]
    });

    let slots = client.get_range(&TEMPERATURE, 1, 2).unwrap();
    assert_eq!(slots[0].status, Status::Ok);
    assert_eq!(slots[1].status, Status::State);
    assert_eq!(slots[1].data.as_ref(), &[0x01]);

    client.close();
    bus.join().unwrap();
}

#[test]
fn test_get_range_records_wrong_command_in_slot() {
    let (client, remote) = client_pair(Duration::from_millis(200));
    let bus = spawn_bus(remote, |request, _| {
        let mut other = request.clone();
        other.cmd = 0x22;
        vec![
            reply_from(1, &other, &[0, 0, 0, 1]),
            reply_from(2, request, &[0, 0, 0, 2]),
        ]
    });

    let slots = client.get_range(&TEMPERATURE, 1, 2).unwrap();
    assert_eq!((slots[0].id, slots[0].status), (1, Status::Cmd));
    assert!(slots[0].data.is_empty());
    assert_eq!((slots[1].id, slots[1].status), (2, Status::Ok));
    assert_eq!(slots[1].data.as_ref(), &[0, 0, 0, 2]);

    client.close();
    bus.join().unwrap();
}

#[test]
fn test_get_range_waits_out_every_slot() {
    let (client, remote) = client_pair(Duration::from_millis(200));
    let bus = spawn_bus(remote, |request, _| {
        // Device 1 is silent; device 2 answers after the first pend window.
        thread::sleep(Duration::from_millis(300));
        vec![reply_from(2, request, &[0, 0, 0, 2])]
    });

    let slots = client.get_range(&TEMPERATURE, 1, 2).unwrap();
    assert_eq!((slots[0].id, slots[0].status), (1, Status::Timeout));
    assert_eq!((slots[1].id, slots[1].status), (2, Status::Ok));
    assert_eq!(slots[1].data.as_ref(), &[0, 0, 0, 2]);

    client.close();
    bus.join().unwrap();
}

#[test]
fn test_hangup_makes_client_dead() {
    let (client, mut remote) = client_pair(Duration::from_secs(1));
    let device = thread::spawn(move || {
        // Take one request, then drop off the bus.
        next_request(&mut remote);
    });
    client.send(Rw::Read, &POS_TARGET, &[]).unwrap();
    device.join().unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while !client.is_error() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(client.is_error());
    let err = client.transact(Rw::Read, &POS_TARGET, &[], None).unwrap_err();
    assert_eq!(err.status(), Status::Dead);
    assert_eq!(err.status().code(), -999);
}
