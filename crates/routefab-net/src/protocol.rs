use serde::{Deserialize, Serialize};

use routefab_core::envelope::base64_bytes;
use routefab_routing::table::TableRow;

/// First message on a registration connection: the node's name, sealed with
/// the controller's sealing key. The controller is the only party able to
/// read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Sealed identity bytes ([`routefab_crypto::SealedPayload`] wire form).
    #[serde(with = "base64_bytes")]
    pub identity: Vec<u8>,
}

/// Controller reply: the registering node's own routing-table row, i.e. its
/// full destination map. Empty for a node admitted on this very request;
/// the next registration after recomputation returns the populated row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub table: TableRow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use routefab_core::NodeName;
    use routefab_routing::PathEntry;

    #[test]
    fn test_register_request_identity_is_opaque() {
        let req = RegisterRequest {
            identity: vec![0x00, 0xFF, 0x80],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"identity":"AP+A"}"#);
        let back: RegisterRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.identity, req.identity);
    }

    #[test]
    fn test_register_response_carries_one_row() {
        let mut table = TableRow::new();
        table.insert(
            NodeName::from("r3"),
            PathEntry::Path(vec![NodeName::from("r1"), NodeName::from("r3")]),
        );
        table.insert(NodeName::from("r9"), PathEntry::Unreachable);

        let resp = RegisterResponse { table };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"table":{"r3":["r1","r3"],"r9":null}}"#);

        let back: RegisterResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.table.len(), 2);
        assert_eq!(back.table[&NodeName::from("r9")], PathEntry::Unreachable);
    }
}
