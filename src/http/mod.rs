//! Outbound request plumbing: the URL guard and the transport seam.
mod guard;
mod transport;


pub use guard::build_safe_url;
pub use transport::{
    OutboundRequest, ReqwestTransport, RequestBody, Transport, TransportResponse, check_headers,
    header_problem, parse_body,
};
