use crate::channel::{ChannelError, ChannelSpec, LossyConfig};
use crate::rdt::{ConfigError, RdtConfig, Receiver, Sender};
use crate::sim::{DEFAULT_MAX_TICKS, Session, SessionError, SessionSpec};

#[test]
fn default_constants() {
    let cfg = RdtConfig::default();
    assert_eq!(cfg.data_length, 4);
    assert_eq!(cfg.flow_control_window, 15);
    assert_eq!(cfg.retransmit_timeout, 5);
    assert!(cfg.validate().is_ok());
}

#[test]
fn zero_constants_are_rejected() {
    let zero_len = RdtConfig {
        data_length: 0,
        ..RdtConfig::default()
    };
    assert_eq!(zero_len.validate(), Err(ConfigError::ZeroDataLength));
    assert!(Sender::new(zero_len).is_err());

    let zero_win = RdtConfig {
        flow_control_window: 0,
        ..RdtConfig::default()
    };
    assert_eq!(zero_win.validate(), Err(ConfigError::ZeroWindow));

    let zero_rto = RdtConfig {
        retransmit_timeout: 0,
        ..RdtConfig::default()
    };
    assert_eq!(zero_rto.validate(), Err(ConfigError::ZeroTimeout));
}

#[test]
fn partial_config_json_uses_defaults() {
    let cfg: RdtConfig = serde_json::from_str(r#"{ "flow_control_window": 8 }"#).expect("parse config");
    assert_eq!(cfg.flow_control_window, 8);
    assert_eq!(cfg.data_length, 4);
    assert_eq!(cfg.retransmit_timeout, 5);
}

#[test]
fn session_spec_parses_channels() {
    let raw = r#"
{
    "rdt": { "data_length": 4, "flow_control_window": 8, "retransmit_timeout": 3 },
    "forward": { "kind": "lossy", "drop_rate": 0.25, "seed": 9 },
    "reverse": { "kind": "perfect", "latency": 2 },
    "data": "HELLOWORLD"
}
    "#;
    let spec = SessionSpec::from_json(raw).expect("parse spec");
    assert_eq!(spec.data, "HELLOWORLD");
    assert_eq!(spec.max_ticks, DEFAULT_MAX_TICKS);
    assert_eq!(spec.rdt.retransmit_timeout, 3);
    assert_eq!(
        spec.forward,
        ChannelSpec::Lossy(LossyConfig {
            drop_rate: 0.25,
            seed: 9,
            ..LossyConfig::default()
        })
    );
    assert_eq!(spec.reverse, ChannelSpec::Perfect { latency: 2 });
}

#[test]
fn session_spec_defaults_to_perfect_channels() {
    let spec = SessionSpec::from_json(r#"{ "data": "abc" }"#).expect("parse spec");
    assert_eq!(spec.forward, ChannelSpec::Perfect { latency: 1 });
    assert_eq!(spec.reverse, ChannelSpec::default());
    assert_eq!(spec.rdt, RdtConfig::default());
}

#[test]
fn session_spec_rejects_invalid_input() {
    let err = SessionSpec::from_json(r#"{ "data": 5 }"#).expect_err("bad type");
    assert!(matches!(err, SessionError::Json(_)));

    let err = SessionSpec::from_json(r#"{ "rdt": { "data_length": 0 } }"#).expect_err("bad config");
    assert!(matches!(err, SessionError::Config(ConfigError::ZeroDataLength)));
}

#[test]
fn receiver_needs_no_configuration() {
    let r = Receiver::default();
    assert_eq!(r.expected_seq(), 1);
    assert!(r.data_received().is_empty());
}

#[test]
fn channel_errors_are_reported_separately_from_protocol_errors() {
    let spec = SessionSpec {
        forward: ChannelSpec::Lossy(LossyConfig {
            duplicate_rate: -0.1,
            ..LossyConfig::default()
        }),
        data: "abc".to_string(),
        ..SessionSpec::default()
    };
    let err = Session::from_spec(&spec).err().expect("bad channel");
    assert!(matches!(
        err,
        SessionError::Channel(ChannelError::RateOutOfRange {
            field: "duplicate_rate",
            ..
        })
    ));
}
