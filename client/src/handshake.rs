use serde::Deserialize;

/// Outcome of the `/client` POST: the response body on success, or a short
/// transport-level description on failure.
pub type InitHttpResult = Result<String, String>;

/// Completion callback handed to the HTTP collaborator.
pub type InitCompletion = Box<dyn FnOnce(InitHttpResult) + Send>;

/// HTTP collaborator driving the initial handshake.
///
/// `post_init` POSTs the given form fields to `/client` on `host:port` and
/// invokes `done` exactly once from any thread; the engine applies the
/// outcome on its next tick.
pub trait InitRequestClient: Send + Sync {
    fn post_init(&self, host: &str, port: u16, fields: Vec<(String, String)>, done: InitCompletion);
}

#[derive(Debug, Deserialize)]
struct RawInitResponse {
    error: Option<String>,
    #[serde(rename = "sH")]
    scripthook: Option<bool>,
    #[serde(rename = "enhancedHostSupport", default)]
    enhanced_host_support: bool,
    token: Option<String>,
    protocol: Option<u32>,
}

/// What the engine should do with a handshake response body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitDecision {
    Accept {
        token: String,
        protocol: u32,
        scripthook_allowed: bool,
        enhanced_host_support: bool,
    },
    Reject {
        message: String,
    },
}

/// Parses the YAML body of an accepted `/client` POST.
pub fn parse_init_response(body: &str) -> InitDecision {
    let raw: RawInitResponse = match serde_yaml::from_str(body) {
        Ok(raw) => raw,
        Err(_) => {
            return InitDecision::Reject {
                message: "Invalid handshake response from server.".to_string(),
            }
        }
    };

    if let Some(message) = raw.error {
        return InitDecision::Reject { message };
    }

    let Some(scripthook_allowed) = raw.scripthook else {
        // no scripts setting: old server or a rival project
        return InitDecision::Reject {
            message: "Legacy servers are incompatible with this client. Update the server to a current build.".to_string(),
        };
    };

    let (Some(token), Some(protocol)) = (raw.token, raw.protocol) else {
        return InitDecision::Reject {
            message: "Invalid handshake response from server.".to_string(),
        };
    };

    InitDecision::Accept {
        token,
        protocol,
        scripthook_allowed,
        enhanced_host_support: raw.enhanced_host_support,
    }
}

/// Uppercase hex encoding for the `authTicket` form field.
pub fn encode_auth_ticket(ticket: &[u8]) -> String {
    let mut out = String::with_capacity(ticket.len() * 2);
    for byte in ticket {
        out.push_str(&format!("{:02X}", byte));
    }
    out
}
