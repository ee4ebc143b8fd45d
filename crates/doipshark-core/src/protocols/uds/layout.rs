//! ISO 14229-1 service identifiers.

pub const SID_DIAGNOSTIC_SESSION_CONTROL: u8 = 0x10;
pub const SID_ECU_RESET: u8 = 0x11;
pub const SID_CLEAR_DIAGNOSTIC_INFO: u8 = 0x14;
pub const SID_READ_DTC: u8 = 0x19;
pub const SID_READ_DATA_BY_ID: u8 = 0x22;
pub const SID_READ_MEMORY_BY_ADDRESS: u8 = 0x23;
pub const SID_READ_SCALING_DATA_BY_ID: u8 = 0x24;
pub const SID_SECURITY_ACCESS: u8 = 0x27;
pub const SID_COMMUNICATION_CONTROL: u8 = 0x28;
pub const SID_AUTHENTICATION: u8 = 0x29;
pub const SID_READ_DATA_BY_PERIODIC_ID: u8 = 0x2A;
pub const SID_DYNAMICALLY_DEFINE_DATA_ID: u8 = 0x2C;
pub const SID_WRITE_DATA_BY_ID: u8 = 0x2E;
pub const SID_INPUT_OUTPUT_CONTROL_BY_ID: u8 = 0x2F;
pub const SID_ROUTINE_CONTROL: u8 = 0x31;
pub const SID_REQUEST_DOWNLOAD: u8 = 0x34;
pub const SID_REQUEST_UPLOAD: u8 = 0x35;
pub const SID_TRANSFER_DATA: u8 = 0x36;
pub const SID_REQUEST_TRANSFER_EXIT: u8 = 0x37;
pub const SID_REQUEST_FILE_TRANSFER: u8 = 0x38;
pub const SID_WRITE_MEMORY_BY_ADDRESS: u8 = 0x3D;
pub const SID_TESTER_PRESENT: u8 = 0x3E;
pub const SID_ACCESS_TIMING_PARAMETER: u8 = 0x83;
pub const SID_SECURED_DATA_TRANSMISSION: u8 = 0x84;
pub const SID_CONTROL_DTC_SETTING: u8 = 0x85;
pub const SID_RESPONSE_ON_EVENT: u8 = 0x86;
pub const SID_LINK_CONTROL: u8 = 0x87;

pub const SID_NEGATIVE_RESPONSE: u8 = 0x7F;
/// Added to a request SID to form its positive response SID.
pub const POSITIVE_RESPONSE_OFFSET: u8 = 0x40;

/// Offset of the SID inside a DoIP diagnostic message payload.
pub const SID_OFFSET: usize = 4;

pub const REQUEST_SIDS: [(u8, &str); 27] = [
    (SID_DIAGNOSTIC_SESSION_CONTROL, "DiagnosticSessionControl"),
    (SID_ECU_RESET, "ECUReset"),
    (SID_CLEAR_DIAGNOSTIC_INFO, "ClearDiagnosticInformation"),
    (SID_READ_DTC, "ReadDTCInformation"),
    (SID_READ_DATA_BY_ID, "ReadDataByIdentifier"),
    (SID_READ_MEMORY_BY_ADDRESS, "ReadMemoryByAddress"),
    (SID_READ_SCALING_DATA_BY_ID, "ReadScalingDataByIdentifier"),
    (SID_SECURITY_ACCESS, "SecurityAccess"),
    (SID_COMMUNICATION_CONTROL, "CommunicationControl"),
    (SID_AUTHENTICATION, "Authentication"),
    (SID_READ_DATA_BY_PERIODIC_ID, "ReadDataByPeriodicIdentifier"),
    (SID_DYNAMICALLY_DEFINE_DATA_ID, "DynamicallyDefineDataIdentifier"),
    (SID_WRITE_DATA_BY_ID, "WriteDataByIdentifier"),
    (SID_INPUT_OUTPUT_CONTROL_BY_ID, "InputOutputControlByIdentifier"),
    (SID_ROUTINE_CONTROL, "RoutineControl"),
    (SID_REQUEST_DOWNLOAD, "RequestDownload"),
    (SID_REQUEST_UPLOAD, "RequestUpload"),
    (SID_TRANSFER_DATA, "TransferData"),
    (SID_REQUEST_TRANSFER_EXIT, "RequestTransferExit"),
    (SID_REQUEST_FILE_TRANSFER, "RequestFileTransfer"),
    (SID_WRITE_MEMORY_BY_ADDRESS, "WriteMemoryByAddress"),
    (SID_TESTER_PRESENT, "TesterPresent"),
    (SID_ACCESS_TIMING_PARAMETER, "AccessTimingParameter"),
    (SID_SECURED_DATA_TRANSMISSION, "SecuredDataTransmission"),
    (SID_CONTROL_DTC_SETTING, "ControlDTCSetting"),
    (SID_RESPONSE_ON_EVENT, "ResponseOnEvent"),
    (SID_LINK_CONTROL, "LinkControl"),
];
