//! # Integration tests: socket pipelines over a simulated wire
//!
//! Each test opens a socket on one end of a [`SimWire`] and drives the other
//! end by hand (or with a second socket). No broadcast traffic here — the
//! broadcast fan-out has its own test binary so the process-wide socket
//! registry cannot leak frames between tests.

use std::time::{Duration, Instant};

use bytes::BytesMut;

use tether_link::codec::encode;
use tether_link::reader::FrameReader;
use tether_link::table;
use tether_link::wire::{Packet, PacketBody, TypedValue};
use tether_link::{SerialDriver, Socket, SocketConfig};
use tether_sim::{Impairment, SimWire};

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Route link logs to the test output when `RUST_LOG` asks for them.
fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fast timing for tests; a generous ack timeout keeps retransmissions out of
/// tests that do not want them.
fn no_retry_config() -> SocketConfig {
    SocketConfig {
        update_interval: Duration::from_millis(1),
        post_transmit_delay: Duration::from_millis(1),
        ack_timeout: Duration::from_secs(60),
        max_retries: 3,
        revive_delay: Duration::from_millis(50),
        queue_capacity: 64,
    }
}

/// Pull everything available off a raw wire end and decode complete frames.
fn drain_frames(wire: &mut SimWire, frames: &mut FrameReader) -> Vec<Packet> {
    let mut out = Vec::new();
    let mut chunk = BytesMut::new();
    if wire.read(&mut chunk) > 0 {
        if let Some(packet) = frames.feed(&chunk) {
            out.push(packet);
        }
    }
    while let Some(packet) = frames.feed(&[]) {
        out.push(packet);
    }
    out
}

/// Collect frames from a raw wire end until `deadline` elapses.
fn collect_for(wire: &mut SimWire, frames: &mut FrameReader, window: Duration) -> Vec<Packet> {
    let deadline = Instant::now() + window;
    let mut out = Vec::new();
    while Instant::now() < deadline {
        out.extend(drain_frames(wire, frames));
        std::thread::sleep(Duration::from_millis(2));
    }
    out
}

/// Wait until `predicate` holds or panic after two seconds.
fn wait_until(what: &str, mut predicate: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if predicate() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("timed out waiting for {what}");
}

// ─── Outbound Path ──────────────────────────────────────────────────────────

#[test]
fn open_transmits_reset_first() {
    let (robot_end, mut peer_end) = SimWire::pair();
    let _socket = Socket::open_with_config(robot_end, no_retry_config());

    let mut frames = FrameReader::new();
    wait_until("reset frame", || {
        drain_frames(&mut peer_end, &mut frames)
            .iter()
            .any(|p| p.body == PacketBody::Reset)
    });
}

#[test]
fn rapid_updates_coalesce_to_one_frame() -> anyhow::Result<()> {
    let (robot_end, mut peer_end) = SimWire::pair();
    let socket = Socket::open_with_config(
        robot_end,
        SocketConfig {
            // Slow drain so both updates land in the queue between ticks.
            update_interval: Duration::from_millis(150),
            ..no_retry_config()
        },
    );

    // Let the initial drain (reset packet) finish and the writer settle into
    // its between-ticks sleep.
    wait_until("queue drained", || socket.queue_len() == 0);
    std::thread::sleep(Duration::from_millis(20));

    socket.write_packet(PacketBody::UpdateDouble {
        value_id: 42,
        value: 1.0,
    })?;
    socket.write_packet(PacketBody::UpdateDouble {
        value_id: 42,
        value: 2.0,
    })?;
    assert_eq!(socket.queue_len(), 1, "second update should merge");

    let mut frames = FrameReader::new();
    let received = collect_for(&mut peer_end, &mut frames, Duration::from_millis(400));

    let updates: Vec<&Packet> = received
        .iter()
        .filter(|p| p.body.value_id() == Some(42))
        .collect();
    assert_eq!(updates.len(), 1, "coalesced update transmits exactly once");
    assert_eq!(
        updates[0].body,
        PacketBody::UpdateDouble {
            value_id: 42,
            value: 2.0
        }
    );
    assert_eq!(socket.stats().coalesced, 1);
    Ok(())
}

#[test]
fn queue_full_surfaces_to_caller() -> anyhow::Result<()> {
    let (robot_end, _peer_end) = SimWire::pair();
    let socket = Socket::open_with_config(
        robot_end,
        SocketConfig {
            // Park the writer after the initial drain.
            update_interval: Duration::from_secs(60),
            queue_capacity: 4,
            ..no_retry_config()
        },
    );
    wait_until("queue drained", || socket.queue_len() == 0);
    std::thread::sleep(Duration::from_millis(20));

    for id in 0..4u16 {
        socket.write_packet(PacketBody::UpdateInt {
            value_id: 0x3200 + id,
            value: 1,
        })?;
    }
    let err = socket
        .write_packet(PacketBody::UpdateInt {
            value_id: 0x32FF,
            value: 1,
        })
        .unwrap_err();
    assert!(matches!(err, tether_link::LinkError::QueueFull));
    assert_eq!(socket.queue_len(), 4, "rejection must not displace entries");
    assert_eq!(socket.stats().queue_rejections, 1);
    Ok(())
}

// ─── Acknowledgement Path ───────────────────────────────────────────────────

#[test]
fn ack_with_matching_seq_clears_pending() -> anyhow::Result<()> {
    let (robot_end, mut peer_end) = SimWire::pair();
    let socket = Socket::open_with_config(robot_end, no_retry_config());

    socket.write_packet(PacketBody::UpdateBool {
        value_id: 0x3300,
        value: true,
    })?;

    // Receive everything the robot sent, then ack each frame by its seq_id.
    let mut frames = FrameReader::new();
    let received = collect_for(&mut peer_end, &mut frames, Duration::from_millis(150));
    assert!(received.len() >= 2, "expected reset and update frames");

    wait_until("packets pending", || socket.pending_count() >= 2);
    for packet in &received {
        let ack = encode(&Packet::with_seq(packet.seq_id, PacketBody::GenericAck))?;
        peer_end.write(&ack);
        // One frame per read cycle: the reader only scans on fresh bytes.
        std::thread::sleep(Duration::from_millis(10));
    }

    wait_until("pending list to empty", || socket.pending_count() == 0);
    assert_eq!(socket.stats().retransmits, 0);
    Ok(())
}

#[test]
fn ack_with_wrong_seq_leaves_pending() -> anyhow::Result<()> {
    let (robot_end, mut peer_end) = SimWire::pair();
    let socket = Socket::open_with_config(robot_end, no_retry_config());

    wait_until("reset pending", || socket.pending_count() == 1);

    // Reset carries seq 0; ack something else.
    let ack = encode(&Packet::with_seq(200, PacketBody::GenericAck))?;
    peer_end.write(&ack);

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(socket.pending_count(), 1);
    Ok(())
}

#[test]
fn nack_triggers_prompt_retransmission() -> anyhow::Result<()> {
    let (robot_end, mut peer_end) = SimWire::pair();
    let socket = Socket::open_with_config(robot_end, no_retry_config());

    let mut frames = FrameReader::new();
    let received = collect_for(&mut peer_end, &mut frames, Duration::from_millis(100));
    let reset_seq = received
        .iter()
        .find(|p| p.body == PacketBody::Reset)
        .expect("reset frame")
        .seq_id;

    let nack = encode(&Packet::with_seq(reset_seq, PacketBody::GenericNack))?;
    peer_end.write(&nack);

    // The ack timeout is 60 s here, so only the NACK can cause this.
    wait_until("nack retransmission", || socket.stats().retransmits == 1);
    let resent = collect_for(&mut peer_end, &mut frames, Duration::from_millis(100));
    assert!(resent.iter().any(|p| p.body == PacketBody::Reset));
    Ok(())
}

#[test]
fn unacked_packets_retry_then_drop() -> anyhow::Result<()> {
    init_logs();
    let (robot_end, _peer_end) = SimWire::pair();
    let socket = Socket::open_with_config(
        robot_end,
        SocketConfig {
            update_interval: Duration::from_millis(2),
            post_transmit_delay: Duration::from_millis(1),
            ack_timeout: Duration::from_millis(20),
            ..no_retry_config()
        },
    );

    socket.write_packet(PacketBody::UpdateInt {
        value_id: 0x3400,
        value: 9,
    })?;

    // Reset + update: each retransmits exactly three times, then drops.
    wait_until("both packets dropped", || {
        socket.stats().dropped_after_retries == 2
    });
    assert_eq!(socket.stats().retransmits, 6);
    assert_eq!(socket.pending_count(), 0);
    Ok(())
}

// ─── Inbound Path ───────────────────────────────────────────────────────────

#[test]
fn inbound_update_lands_in_value_table() -> anyhow::Result<()> {
    let (robot_end, mut peer_end) = SimWire::pair();
    let _socket = Socket::open_with_config(robot_end, no_retry_config());

    let update = encode(&Packet::with_seq(
        7,
        PacketBody::UpdateFloat {
            value_id: 0x3500,
            value: 4.5,
        },
    ))?;
    peer_end.write(&update);

    wait_until("value table entry", || {
        table::get(0x3500) == Some(TypedValue::Float(4.5))
    });
    Ok(())
}

#[test]
fn garbage_before_frame_resyncs() -> anyhow::Result<()> {
    let (robot_end, mut peer_end) = SimWire::pair();
    let _socket = Socket::open_with_config(robot_end, no_retry_config());

    let mut wire = vec![0x17, 0x2B, 0xAA, 0x21, 0x44];
    wire.extend_from_slice(&encode(&Packet::with_seq(
        1,
        PacketBody::UpdateBool {
            value_id: 0x3600,
            value: true,
        },
    ))?);
    peer_end.write(&wire);

    wait_until("value table entry", || {
        table::get(0x3600) == Some(TypedValue::Bool(true))
    });
    Ok(())
}

#[test]
fn inbound_array_update_lands_whole() -> anyhow::Result<()> {
    let (robot_end, mut peer_end) = SimWire::pair();
    let _socket = Socket::open_with_config(robot_end, no_retry_config());

    let update = encode(&Packet::with_seq(
        2,
        PacketBody::UpdateIntArray {
            value_id: 0x3700,
            values: vec![10, 20, 30],
        },
    ))?;
    peer_end.write(&update);

    wait_until("value table entry", || {
        table::get(0x3700) == Some(TypedValue::IntArray(vec![10, 20, 30]))
    });
    Ok(())
}

#[test]
fn unhandled_kinds_are_accepted_not_fatal() -> anyhow::Result<()> {
    let (robot_end, mut peer_end) = SimWire::pair();
    let socket = Socket::open_with_config(robot_end, no_retry_config());

    for body in [
        PacketBody::Ping,
        PacketBody::FetchValues,
        PacketBody::Log {
            message: "from peer".into(),
        },
        PacketBody::AssignLabel {
            value_id: 0x3800,
            label: "peer/label".into(),
        },
    ] {
        let frame = encode(&Packet::with_seq(0, body))?;
        peer_end.write(&frame);
        // One frame per read cycle: the reader only scans on fresh bytes.
        std::thread::sleep(Duration::from_millis(10));
    }
    // A value update after them proves the reader survived all four.
    let update = encode(&Packet::with_seq(
        0,
        PacketBody::UpdateInt {
            value_id: 0x3801,
            value: 5,
        },
    ))?;
    peer_end.write(&update);

    wait_until("reader still dispatching", || {
        table::get(0x3801) == Some(TypedValue::Int(5))
    });
    assert!(socket.stats().frames_received >= 5);
    Ok(())
}

// ─── Two Sockets, Impaired Wire ─────────────────────────────────────────────

#[test]
fn socket_pair_converses_over_clean_wire() -> anyhow::Result<()> {
    let (robot_end, companion_end) = SimWire::pair();
    let robot = Socket::open_with_config(robot_end, no_retry_config());
    let _companion = Socket::open_with_config(companion_end, no_retry_config());

    // Let the reset frame cross on its own read cycle first.
    std::thread::sleep(Duration::from_millis(50));
    robot.write_packet(PacketBody::UpdateString {
        value_id: 0x3900,
        value: "ready".into(),
    })?;

    wait_until("value crosses the wire", || {
        table::get(0x3900) == Some(TypedValue::Str("ready".into()))
    });
    Ok(())
}

#[test]
fn corrupted_frames_drop_but_link_recovers() -> anyhow::Result<()> {
    init_logs();
    let (robot_end, companion_end) = SimWire::pair_with(
        Impairment::none().with_corruption(0.5).with_seed(1234),
        Impairment::none(),
    );
    let retry_config = SocketConfig {
        update_interval: Duration::from_millis(2),
        post_transmit_delay: Duration::from_millis(1),
        ack_timeout: Duration::from_millis(15),
        ..no_retry_config()
    };
    let robot = Socket::open_with_config(robot_end, retry_config.clone());
    let companion = Socket::open_with_config(companion_end, retry_config);

    for value in 0..30 {
        robot.write_packet(PacketBody::UpdateInt {
            value_id: 0x3A00,
            value,
        })?;
        std::thread::sleep(Duration::from_millis(5));
    }

    wait_until("an update to survive corruption", || {
        matches!(table::get(0x3A00), Some(TypedValue::Int(_)))
    });
    wait_until("corrupted frames to be counted", || {
        companion.stats().decode_failures > 0
    });
    Ok(())
}
