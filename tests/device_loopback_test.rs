// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device facade against the in-process simulated board
//!
//! These tests drive a [`Device`] through a [`LoopbackTransport`], so every
//! request goes through the same firmware rules a real board applies.

use std::time::Duration;

use homectrl::device::{
    Command, Device, DeviceError, PinCounterField, PinSettingField, ProtocolVersion,
    RegisterField, SystemSettingField,
};
use homectrl::report;
use homectrl::simulator::{DeviceImage, LoopbackTransport};
use homectrl::transport::TransportError;
use tokio_modbus::ExceptionCode;

fn connected(version: ProtocolVersion, pins: u16) -> (Device<LoopbackTransport>, LoopbackTransport) {
    let image = DeviceImage::new(version.layout(), pins, 1).unwrap();
    let transport = LoopbackTransport::new(image);
    let handle = transport.clone();
    let mut device = Device::new(transport, version.layout()).unwrap();
    assert_eq!(device.connect().unwrap(), pins);
    (device, handle)
}

#[test]
fn test_set_field_then_read_all() {
    for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
        let (mut device, _) = connected(version, 12);

        let mut settings = device.pin_settings(7).unwrap();
        settings.set_field("group", 3).unwrap();
        settings
            .set(PinSettingField::SingleClickCommand, Command::On.code())
            .unwrap();
        settings.set_field("pwm_on_value", 0x80).unwrap();

        let values = settings.read_all().unwrap();
        assert_eq!(values.len(), PinSettingField::ALL.len());
        assert_eq!(values.get(PinSettingField::Group), Some(3));
        assert_eq!(
            values.get(PinSettingField::SingleClickCommand),
            Some(Command::On.code())
        );
        assert_eq!(values.get(PinSettingField::PwmOnValue), Some(0x80));

        // Neighbouring pins are untouched
        let neighbour = device.pin_settings(8).unwrap().read_all().unwrap();
        assert!(neighbour.iter().all(|(_, value)| value == 0));
    }
}

#[test]
fn test_firmware_rejections_surface_as_transport_errors() {
    let (mut device, _) = connected(ProtocolVersion::V2, 4);

    let err = device
        .pin_settings(0)
        .unwrap()
        .set(PinSettingField::Mode, 0x03)
        .unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Transport(TransportError::Exception(ExceptionCode::IllegalDataValue))
    ));

    let err = device
        .pin_settings(0)
        .unwrap()
        .set(PinSettingField::ClickCommand, Command::FadeToggle.code())
        .unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Transport(TransportError::Exception(ExceptionCode::IllegalDataValue))
    ));
}

#[test]
fn test_invalid_pin_index() {
    let (mut device, _) = connected(ProtocolVersion::V2, 4);
    assert!(matches!(
        device.pin_settings(4),
        Err(DeviceError::InvalidPinIndex {
            index: 4,
            number_of_pins: 4
        })
    ));
    assert!(matches!(
        device.pin_counters(100),
        Err(DeviceError::InvalidPinIndex { .. })
    ));
    assert!(matches!(
        device.set_coil(4, true),
        Err(DeviceError::InvalidPinIndex { .. })
    ));
    assert!(matches!(
        device.pin_settings(0).unwrap().set_field("Mode", 1),
        Err(DeviceError::UnknownField(_))
    ));
}

#[test]
fn test_coils_follow_output_mode() {
    let (mut device, _) = connected(ProtocolVersion::V2, 3);

    device
        .pin_settings(1)
        .unwrap()
        .set(PinSettingField::Mode, 0x01)
        .unwrap();
    device.set_coil(0, true).unwrap();
    device.set_coil(1, true).unwrap();

    let coils = device.dump_coils().unwrap();
    assert_eq!(coils, vec![(0, false), (1, true), (2, false)]);

    let output = device.pin_settings(1).unwrap().read_all().unwrap();
    assert_eq!(output.get(PinSettingField::OutputValue), Some(1));
}

#[test]
fn test_dumps() {
    let (mut device, handle) = connected(ProtocolVersion::V2, 2);

    handle
        .image()
        .lock()
        .unwrap()
        .record_event(1, PinCounterField::DoubleClickCnt)
        .unwrap();

    let holding = device.dump_holding_registers().unwrap();
    assert_eq!(holding.len(), 2);
    assert_eq!(holding[1].0, 1);

    let input = device.dump_input_registers().unwrap();
    assert_eq!(input.system.len(), 8);
    assert_eq!(input.system[0], 2);
    assert_eq!(input.pins.len(), 2);
    assert_eq!(input.pins[0].1.get(PinCounterField::PinNumber), Some(2));
    assert_eq!(input.pins[1].1.get(PinCounterField::PinNumber), Some(3));
    assert_eq!(input.pins[1].1.get(PinCounterField::DoubleClickCnt), Some(1));

    let mut out = Vec::new();
    report::write_input_registers(&mut out, &input).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("input register 0: 2\n"));
    assert!(text.contains("pin 1 pin_number: 3\n"));
    assert!(text.contains("pin 1 double_click_cnt: 1\n"));
}

#[test]
fn test_empty_board() {
    let (mut device, _) = connected(ProtocolVersion::V2, 0);
    assert!(device.dump_coils().unwrap().is_empty());
    assert!(device.dump_holding_registers().unwrap().is_empty());
    let input = device.dump_input_registers().unwrap();
    assert!(input.pins.is_empty());
}

#[test]
fn test_uptime() {
    let (mut device, handle) = connected(ProtocolVersion::V2, 1);
    handle
        .image()
        .lock()
        .unwrap()
        .advance_uptime(Duration::from_secs(90_000));

    let millis = device.uptime_millis().unwrap();
    assert!(millis >= 90_000_000);
    assert!(device.uptime_seconds().unwrap() >= 90_000.0);
}

#[test]
fn test_system_settings_and_slave_id() {
    let (mut device, handle) = connected(ProtocolVersion::V2, 1);

    let system = device.system_settings().unwrap();
    assert_eq!(system.get(SystemSettingField::Magic), Some(0x43));
    assert_eq!(system.get(SystemSettingField::SlaveId), Some(1));

    device.set_slave_id(17).unwrap();
    assert_eq!(handle.image().lock().unwrap().slave_id(), 17);

    assert!(matches!(
        device.set_slave_id(0),
        Err(DeviceError::InvalidValue { .. })
    ));
    assert!(matches!(
        device.set_slave_id(300),
        Err(DeviceError::InvalidValue { .. })
    ));
    assert_eq!(handle.image().lock().unwrap().slave_id(), 17);

    // The transport handed back still shares the same board
    let transport = device.into_transport();
    assert_eq!(transport.image().lock().unwrap().slave_id(), 17);
}

#[test]
fn test_group_command_from_button_event() {
    let (mut device, handle) = connected(ProtocolVersion::V2, 4);

    {
        let mut button = device.pin_settings(0).unwrap();
        button.set(PinSettingField::Mode, 0x06).unwrap();
        button.set(PinSettingField::Group, 2).unwrap();
        button
            .set(PinSettingField::LongClickCommand, Command::On.code())
            .unwrap();
    }
    {
        let mut lamp = device.pin_settings(3).unwrap();
        lamp.set(PinSettingField::Mode, 0x01).unwrap();
        lamp.set(PinSettingField::Group, 2).unwrap();
    }

    handle
        .image()
        .lock()
        .unwrap()
        .record_event(0, PinCounterField::LongPressCnt)
        .unwrap();

    let coils = device.dump_coils().unwrap();
    assert_eq!(coils[3], (3, true));
    let counters = device.pin_counters(0).unwrap().read_all().unwrap();
    assert_eq!(counters.get(PinCounterField::LongPressCnt), Some(1));
}
