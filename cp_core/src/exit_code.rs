//! curl exit statuses the probing logic reacts to.

/// `CURLE_WEIRD_SERVER_REPLY`
pub const WEIRD_SERVER_REPLY: i32 = 8;
/// `CURLE_HTTP2`: error in the HTTP/2 framing layer.
pub const HTTP2_FRAMING_ERROR: i32 = 16;
/// `CURLE_HTTP_RETURNED_ERROR`: `--fail` tripped on a >= 400 status.
pub const HTTP_RETURNED_ERROR: i32 = 22;
/// `CURLE_OPERATION_TIMEDOUT`
pub const OPERATION_TIMEDOUT: i32 = 28;
/// `CURLE_GOT_NOTHING`: the server closed without replying.
pub const GOT_NOTHING: i32 = 52;
/// `CURLE_RECV_ERROR`, also raised on an unexpected EOF.
pub const RECV_ERROR: i32 = 56;

/// Statuses after which the dumped headers are still worth reading.
pub const SOFT_HEADER_ERRORS: [i32; 3] = [WEIRD_SERVER_REPLY, HTTP_RETURNED_ERROR, RECV_ERROR];

/// Transient network failures retried by the reachability audit.
pub const TRANSIENT_NETWORK_ERRORS: [i32; 2] = [GOT_NOTHING, RECV_ERROR];
