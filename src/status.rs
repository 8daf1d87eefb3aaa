//! Symbolic names for SDK status codes.

/// Look up the symbolic name of a status code.
///
/// Unknown codes are rendered as `EDS_ERR_UNKNOWN_0x…` so messages stay
/// useful when a newer body reports something this table predates.
#[must_use]
pub fn status_name(code: u32) -> String {
    known_name(code).map_or_else(|| format!("EDS_ERR_UNKNOWN_0x{code:08X}"), str::to_owned)
}

#[allow(clippy::too_many_lines)]
const fn known_name(code: u32) -> Option<&'static str> {
    let name = match code {
        0x0000_0000 => "EDS_ERR_OK",

        // Miscellaneous
        0x0000_0001 => "EDS_ERR_UNIMPLEMENTED",
        0x0000_0002 => "EDS_ERR_INTERNAL_ERROR",
        0x0000_0003 => "EDS_ERR_MEM_ALLOC_FAILED",
        0x0000_0004 => "EDS_ERR_MEM_FREE_FAILED",
        0x0000_0005 => "EDS_ERR_OPERATION_CANCELLED",
        0x0000_0006 => "EDS_ERR_INCOMPATIBLE_VERSION",
        0x0000_0007 => "EDS_ERR_NOT_SUPPORTED",
        0x0000_0008 => "EDS_ERR_UNEXPECTED_EXCEPTION",
        0x0000_0009 => "EDS_ERR_PROTECTION_VIOLATION",
        0x0000_000A => "EDS_ERR_MISSING_SUBCOMPONENT",
        0x0000_000B => "EDS_ERR_SELECTION_UNAVAILABLE",

        // File
        0x0000_0020 => "EDS_ERR_FILE_IO_ERROR",
        0x0000_0021 => "EDS_ERR_FILE_TOO_MANY_OPEN",
        0x0000_0022 => "EDS_ERR_FILE_NOT_FOUND",
        0x0000_0023 => "EDS_ERR_FILE_OPEN_ERROR",
        0x0000_0024 => "EDS_ERR_FILE_CLOSE_ERROR",
        0x0000_0025 => "EDS_ERR_FILE_SEEK_ERROR",
        0x0000_0026 => "EDS_ERR_FILE_TELL_ERROR",
        0x0000_0027 => "EDS_ERR_FILE_READ_ERROR",
        0x0000_0028 => "EDS_ERR_FILE_WRITE_ERROR",
        0x0000_0029 => "EDS_ERR_FILE_PERMISSION_ERROR",
        0x0000_002A => "EDS_ERR_FILE_DISK_FULL_ERROR",
        0x0000_002B => "EDS_ERR_FILE_ALREADY_EXISTS",
        0x0000_002C => "EDS_ERR_FILE_FORMAT_UNRECOGNIZED",
        0x0000_002D => "EDS_ERR_FILE_DATA_CORRUPT",
        0x0000_002E => "EDS_ERR_FILE_NAMING_NA",

        // Directory
        0x0000_0040 => "EDS_ERR_DIR_NOT_FOUND",
        0x0000_0041 => "EDS_ERR_DIR_IO_ERROR",
        0x0000_0042 => "EDS_ERR_DIR_ENTRY_NOT_FOUND",
        0x0000_0043 => "EDS_ERR_DIR_ENTRY_EXISTS",
        0x0000_0044 => "EDS_ERR_DIR_NOT_EMPTY",

        // Property
        0x0000_0050 => "EDS_ERR_PROPERTIES_UNAVAILABLE",
        0x0000_0051 => "EDS_ERR_PROPERTIES_MISMATCH",
        0x0000_0053 => "EDS_ERR_PROPERTIES_NOT_LOADED",

        // Function parameters
        0x0000_0060 => "EDS_ERR_INVALID_PARAMETER",
        0x0000_0061 => "EDS_ERR_INVALID_HANDLE",
        0x0000_0062 => "EDS_ERR_INVALID_POINTER",
        0x0000_0063 => "EDS_ERR_INVALID_INDEX",
        0x0000_0064 => "EDS_ERR_INVALID_LENGTH",
        0x0000_0065 => "EDS_ERR_INVALID_FN_POINTER",
        0x0000_0066 => "EDS_ERR_INVALID_SORT_FN",

        // Device
        0x0000_0080 => "EDS_ERR_DEVICE_NOT_FOUND",
        0x0000_0081 => "EDS_ERR_DEVICE_BUSY",
        0x0000_0082 => "EDS_ERR_DEVICE_INVALID",
        0x0000_0083 => "EDS_ERR_DEVICE_EMERGENCY",
        0x0000_0084 => "EDS_ERR_DEVICE_MEMORY_FULL",
        0x0000_0085 => "EDS_ERR_DEVICE_INTERNAL_ERROR",
        0x0000_0086 => "EDS_ERR_DEVICE_INVALID_PARAMETER",
        0x0000_0087 => "EDS_ERR_DEVICE_NO_DISK",
        0x0000_0088 => "EDS_ERR_DEVICE_DISK_ERROR",
        0x0000_0089 => "EDS_ERR_DEVICE_CF_GATE_CHANGED",
        0x0000_008A => "EDS_ERR_DEVICE_DIAL_CHANGED",
        0x0000_008B => "EDS_ERR_DEVICE_NOT_INSTALLED",
        0x0000_008C => "EDS_ERR_DEVICE_STAY_AWAKE",
        0x0000_008D => "EDS_ERR_DEVICE_NOT_RELEASED",

        // Stream
        0x0000_00A0 => "EDS_ERR_STREAM_IO_ERROR",
        0x0000_00A1 => "EDS_ERR_STREAM_NOT_OPEN",
        0x0000_00A2 => "EDS_ERR_STREAM_ALREADY_OPEN",
        0x0000_00A3 => "EDS_ERR_STREAM_OPEN_ERROR",
        0x0000_00A4 => "EDS_ERR_STREAM_CLOSE_ERROR",
        0x0000_00A5 => "EDS_ERR_STREAM_SEEK_ERROR",
        0x0000_00A6 => "EDS_ERR_STREAM_TELL_ERROR",
        0x0000_00A7 => "EDS_ERR_STREAM_READ_ERROR",
        0x0000_00A8 => "EDS_ERR_STREAM_WRITE_ERROR",
        0x0000_00A9 => "EDS_ERR_STREAM_PERMISSION_ERROR",
        0x0000_00AA => "EDS_ERR_STREAM_COULDNT_BEGIN_THREAD",
        0x0000_00AB => "EDS_ERR_STREAM_BAD_OPTIONS",
        0x0000_00AC => "EDS_ERR_STREAM_END_OF_STREAM",

        // Communications
        0x0000_00C0 => "EDS_ERR_COMM_PORT_IS_IN_USE",
        0x0000_00C1 => "EDS_ERR_COMM_DISCONNECTED",
        0x0000_00C2 => "EDS_ERR_COMM_DEVICE_INCOMPATIBLE",
        0x0000_00C3 => "EDS_ERR_COMM_BUFFER_FULL",
        0x0000_00C4 => "EDS_ERR_COMM_USB_BUS_ERR",

        0x0000_00D0 => "EDS_ERR_USB_DEVICE_LOCK_ERROR",
        0x0000_00D1 => "EDS_ERR_USB_DEVICE_UNLOCK_ERROR",

        0x0000_00E0 => "EDS_ERR_STI_UNKNOWN_ERROR",
        0x0000_00E1 => "EDS_ERR_STI_INTERNAL_ERROR",
        0x0000_00E2 => "EDS_ERR_STI_DEVICE_CREATE_ERROR",
        0x0000_00E3 => "EDS_ERR_STI_DEVICE_RELEASE_ERROR",
        0x0000_00E4 => "EDS_ERR_DEVICE_NOT_LAUNCHED",

        0x0000_00F0 => "EDS_ERR_ENUM_NA",
        0x0000_00F1 => "EDS_ERR_INVALID_FN_CALL",
        0x0000_00F2 => "EDS_ERR_HANDLE_NOT_FOUND",
        0x0000_00F3 => "EDS_ERR_INVALID_ID",
        0x0000_00F4 => "EDS_ERR_WAIT_TIMEOUT_ERROR",

        // PTP
        0x0000_2003 => "EDS_ERR_SESSION_NOT_OPEN",
        0x0000_2004 => "EDS_ERR_INVALID_TRANSACTIONID",
        0x0000_2007 => "EDS_ERR_INCOMPLETE_TRANSFER",
        0x0000_2008 => "EDS_ERR_INVALID_STRAGEID",
        0x0000_200A => "EDS_ERR_DEVICEPROP_NOT_SUPPORTED",
        0x0000_200B => "EDS_ERR_INVALID_OBJECTFORMATCODE",
        0x0000_2011 => "EDS_ERR_SELF_TEST_FAILED",
        0x0000_2012 => "EDS_ERR_PARTIAL_DELETION",
        0x0000_2014 => "EDS_ERR_SPECIFICATION_BY_FORMAT_UNSUPPORTED",
        0x0000_2015 => "EDS_ERR_NO_VALID_OBJECTINFO",
        0x0000_2016 => "EDS_ERR_INVALID_CODE_FORMAT",
        0x0000_2017 => "EDS_ERR_UNKNOWN_VENDOR_CODE",
        0x0000_2018 => "EDS_ERR_CAPTURE_ALREADY_TERMINATED",
        0x0000_201A => "EDS_ERR_INVALID_PARENTOBJECT",
        0x0000_201B => "EDS_ERR_INVALID_DEVICEPROP_FORMAT",
        0x0000_201C => "EDS_ERR_INVALID_DEVICEPROP_VALUE",
        0x0000_201E => "EDS_ERR_SESSION_ALREADY_OPEN",
        0x0000_201F => "EDS_ERR_TRANSACTION_CANCELLED",
        0x0000_2020 => "EDS_ERR_SPECIFICATION_OF_DESTINATION_UNSUPPORTED",

        // PTP vendor
        0x0000_A001 => "EDS_ERR_UNKNOWN_COMMAND",
        0x0000_A005 => "EDS_ERR_OPERATION_REFUSED",
        0x0000_A006 => "EDS_ERR_LENS_COVER_CLOSE",
        0x0000_A101 => "EDS_ERR_LOW_BATTERY",
        0x0000_A102 => "EDS_ERR_OBJECT_NOTREADY",

        // Shutter
        0x0000_8D01 => "EDS_ERR_TAKE_PICTURE_AF_NG",
        0x0000_8D02 => "EDS_ERR_TAKE_PICTURE_RESERVED",
        0x0000_8D03 => "EDS_ERR_TAKE_PICTURE_MIRROR_UP_NG",
        0x0000_8D04 => "EDS_ERR_TAKE_PICTURE_SENSOR_CLEANING_NG",
        0x0000_8D05 => "EDS_ERR_TAKE_PICTURE_SILENCE_NG",
        0x0000_8D06 => "EDS_ERR_TAKE_PICTURE_NO_CARD_NG",
        0x0000_8D07 => "EDS_ERR_TAKE_PICTURE_CARD_NG",
        0x0000_8D08 => "EDS_ERR_TAKE_PICTURE_CARD_PROTECT_NG",

        _ => return None,
    };
    Some(name)
}
