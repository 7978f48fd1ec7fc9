use solaxd::protocol::{
    self, CONTROL_READ, FUNCTION_LIVE_DATA_REPLY, FrameError, LifetimeCounters, decode,
    decode_live_data, encode,
};
use solaxd::transport::simulated::{RX_LIVE_DATA_1, RX_LIVE_DATA_2};

#[test]
fn captured_live_data_decodes_through_public_api() {
    let frame = decode(&RX_LIVE_DATA_1).unwrap();
    assert!(frame.is(CONTROL_READ, FUNCTION_LIVE_DATA_REPLY));
    assert_eq!(frame.payload.len(), 50);

    let mut lifetime = LifetimeCounters::default();
    let first = decode_live_data(&frame.payload, &mut lifetime).unwrap();
    assert_eq!(first.power, 487.0);
    assert!((first.frequency - 49.99).abs() < 1e-3);

    let second = decode_live_data(&decode(&RX_LIVE_DATA_2).unwrap().payload, &mut lifetime)
        .unwrap();
    assert_eq!(second.power, 471.0);
    assert!((second.dc1_voltage - 173.9).abs() < 1e-3);
    assert!((second.frequency - 50.01).abs() < 1e-3);
}

#[test]
fn every_request_decodes_as_a_frame() {
    let serial = protocol::InverterSerial::new(*b"SX1MINI0000042");
    for bytes in [
        protocol::broadcast_query().unwrap(),
        protocol::address_assignment(&serial, 0x0A).unwrap(),
        protocol::live_data_query(0x0A).unwrap(),
    ] {
        let frame = decode(&bytes).unwrap();
        assert_eq!(frame.to_bytes().unwrap(), bytes);
    }
}

#[test]
fn corrupted_checksum_bytes_are_rejected() {
    let mut bytes = RX_LIVE_DATA_1;
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    assert_eq!(
        decode(&bytes),
        Err(FrameError::ChecksumMismatch {
            expected: 0x079C,
            actual: 0x079D
        })
    );
}

#[test]
fn largest_payload_fits_length_byte() {
    let payload = vec![0x5A; protocol::frame::MAX_PAYLOAD_LEN];
    let bytes = encode([1, 0], [0, 0x0A], 0x11, 0x82, &payload).unwrap();
    assert_eq!(bytes[8] as usize, payload.len());
    assert_eq!(decode(&bytes).unwrap().payload, payload);
}
