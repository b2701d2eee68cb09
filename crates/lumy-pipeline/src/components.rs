//! Page component code referenced by a workflow's pages.

use std::path::Path;

use lumy_types::LumyWorkflow;
use lumy_types::messages::Code;
use sha2::{Digest, Sha256};

use crate::error::{BackendError, Result};

/// Hex characters kept from the content digest.
const CODE_ID_LEN: usize = 20;

const FILE_SCHEME: &str = "file://";

/// Content-derived id of a piece of component code.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(CODE_ID_LEN);
    id
}

/// Read the code behind a component url (`file://...` or a plain path).
pub fn load_url(url: &str) -> Result<String> {
    if let Some((scheme, _)) = url.split_once("://")
        && scheme != "file"
    {
        return Err(BackendError::InvalidWorkflow(format!(
            "Unsupported component url scheme '{scheme}': {url}"
        )));
    }
    let path = Path::new(url.strip_prefix(FILE_SCHEME).unwrap_or(url));
    std::fs::read_to_string(path).map_err(|e| BackendError::io(path, e))
}

/// Code of every page that declares a component url, in page order.
pub fn page_components_code(workflow: &LumyWorkflow) -> Result<Vec<Code>> {
    workflow
        .ui
        .pages
        .iter()
        .filter_map(|page| page.component.url.as_deref())
        .map(|url| {
            let content = load_url(url)?;
            Ok(Code {
                id: content_hash(&content),
                content,
            })
        })
        .collect()
}
