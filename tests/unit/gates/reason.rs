use super::*;

#[test]
fn wire_names_match_serde() {
    for code in [
        ReasonCode::FileSizeOutOfBounds,
        ReasonCode::IdentityDrift,
        ReasonCode::MaxAttemptsReached,
        ReasonCode::AdapterFailure,
    ] {
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, format!("\"{}\"", code.as_str()));
    }
}

#[test]
fn adapter_faults_are_hard() {
    assert!(ReasonCode::DimensionMismatch.is_adapter_fault());
    assert!(ReasonCode::DimensionMismatch.is_hard());
    assert!(!ReasonCode::Undecodable.is_adapter_fault());
    assert_eq!(ReasonCode::AdapterFailure.severity(), Severity::Soft);
}
