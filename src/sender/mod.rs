pub mod connection;
pub mod frame;
pub mod patterns;
pub mod response;
pub mod tls;
pub mod transmission;

pub use connection::{ConnectionError, ConnectionProvider, TcpConnector, ZabbixStream};
pub use frame::{
    FrameError, MAX_PAYLOAD_SIZE, SENDER_REQUEST, SenderRequest, ZBX_HEADER, ZBX_HEADER_SIZE,
    decode_frame, encode_frame, encode_request, read_frame, write_frame,
};
pub use patterns::{RESPONSE_PATTERNS, ResponsePatternSet};
pub use response::{ResponseError, parse_response};
pub use tls::{TlsError, build_client_config};
pub use transmission::{BatchTransmitter, ZBX_TRAPPER_MAX_VALUE, partition_size};
