use api_contract::{ApiResponse, ExecuteResultDto};
use domain::ResultStatus;

#[test]
fn api_response_success_wraps_execute_result() {
    let response = ApiResponse::success(ExecuteResultDto {
        log_id: 1,
        result_status: ResultStatus::Timeout,
        result_message: "timeout: no response within 5000 ms".to_string(),
        executed_at_ms: 1_700_000_000_000,
    });
    assert!(response.success);
    assert!(response.error.is_none());

    let value = serde_json::to_value(&response).expect("serialize");
    assert_eq!(value["data"]["resultStatus"], "TIMEOUT");
    assert!(value["error"].is_null());
}

#[test]
fn api_response_error_carries_code() {
    let response = ApiResponse::<()>::error("DEVICE.INACTIVE", "device Projector 2 is inactive");
    assert!(!response.success);
    assert!(response.data.is_none());
    let error = response.error.expect("error body");
    assert_eq!(error.code, "DEVICE.INACTIVE");
}
