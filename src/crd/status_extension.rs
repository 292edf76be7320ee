//! The ingress operator's fragment of `ClusterOperator.status.extension`

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Status fields published by this operator
///
/// An all-default extension encodes to no extension at all, so readers can
/// tell "nothing to report" from an explicitly empty value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngressOperatorStatusExtension {
    /// Comma-separated names of Gateway API CRDs not managed by the operator
    #[serde(
        rename = "unmanagedGatewayAPICRDNames",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub unmanaged_gateway_api_crd_names: Option<String>,
}

impl IngressOperatorStatusExtension {
    /// Build the extension from a list of CRD names; an empty list leaves the field unset
    pub fn from_crd_names<S: AsRef<str>>(crd_names: &[S]) -> Self {
        let unmanaged_gateway_api_crd_names = if crd_names.is_empty() {
            None
        } else {
            Some(
                crd_names
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };
        Self {
            unmanaged_gateway_api_crd_names,
        }
    }

    /// Decode a stored extension; absent or null input is the default extension
    pub fn decode(raw: Option<&serde_json::Value>) -> Result<Self> {
        match raw {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|source| Error::Decode {
                what: "ingress operator status extension".to_string(),
                source,
            }),
        }
    }

    /// Encode for storage; the default extension encodes to `None`
    pub fn encode(&self) -> Result<Option<serde_json::Value>> {
        if *self == Self::default() {
            return Ok(None);
        }
        serde_json::to_value(self)
            .map(Some)
            .map_err(|source| Error::Encode {
                what: "ingress operator status extension".to_string(),
                source,
            })
    }
}
