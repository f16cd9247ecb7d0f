//! Virtual indices: ordered groups of physical indices searched as one.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::index::traits::{IndexOpener, SearchIndex};
use crate::query::SortOrder;

/// Sort order a member index declares its documents to be stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredSortOrder {
    /// Canonical sort field name ("date", "rank", or an item name).
    pub field: String,
    pub order: SortOrder,
}

impl DeclaredSortOrder {
    pub fn new<S: Into<String>>(field: S, order: SortOrder) -> Self {
        DeclaredSortOrder {
            field: field.into(),
            order,
        }
    }
}

/// A member of a virtual index as named in its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub name: String,
    #[serde(default)]
    pub declared_sort: Option<DeclaredSortOrder>,
}

impl MemberSpec {
    pub fn new<S: Into<String>>(name: S) -> Self {
        MemberSpec {
            name: name.into(),
            declared_sort: None,
        }
    }

    pub fn with_declared_sort(mut self, declared_sort: DeclaredSortOrder) -> Self {
        self.declared_sort = Some(declared_sort);
        self
    }
}

/// An opened member index.
#[derive(Debug, Clone)]
pub struct VirtualIndexMember {
    pub index: Arc<dyn SearchIndex>,
    pub declared_sort: Option<DeclaredSortOrder>,
}

/// A searchable unit: one physical index, or several searched in order.
///
/// Document keys of a true virtual index are reported as `"member/key"`.
#[derive(Debug, Clone)]
pub struct VirtualIndexSpec {
    name: String,
    members: Vec<VirtualIndexMember>,
    is_virtual: bool,
    warnings: Vec<String>,
}

impl VirtualIndexSpec {
    /// Wrap a single physical index.
    pub fn physical(index: Arc<dyn SearchIndex>) -> Self {
        VirtualIndexSpec {
            name: index.name().to_string(),
            members: vec![VirtualIndexMember {
                index,
                declared_sort: None,
            }],
            is_virtual: false,
            warnings: Vec::new(),
        }
    }

    /// Build a virtual index from already opened members.
    pub fn from_members<S: Into<String>>(name: S, members: Vec<VirtualIndexMember>) -> Result<Self> {
        let name = name.into();
        if members.is_empty() {
            return Err(SearchError::index(format!(
                "virtual index '{name}' has no members"
            )));
        }
        Ok(VirtualIndexSpec {
            name,
            members,
            is_virtual: true,
            warnings: Vec::new(),
        })
    }

    /// Open every member through `opener`.
    ///
    /// With `ignore_open_errors`, members that fail to open are skipped with a
    /// warning; the virtual index still fails if no member could be opened.
    pub fn open<S: Into<String>>(
        name: S,
        members: &[MemberSpec],
        opener: &dyn IndexOpener,
        ignore_open_errors: bool,
    ) -> Result<Self> {
        let name = name.into();
        let mut opened = Vec::with_capacity(members.len());
        let mut warnings = Vec::new();

        for member in members {
            match opener.open(&member.name) {
                Ok(index) => opened.push(VirtualIndexMember {
                    index,
                    declared_sort: member.declared_sort.clone(),
                }),
                Err(e) if ignore_open_errors => {
                    let message = format!(
                        "Skipped index '{}' of virtual index '{name}': {e}",
                        member.name
                    );
                    warn!("{message}");
                    warnings.push(message);
                }
                Err(e) => return Err(e),
            }
        }

        let mut spec = Self::from_members(name, opened)?;
        spec.warnings = warnings;
        Ok(spec)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[VirtualIndexMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether document keys are qualified with the member name.
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// Warnings collected while opening members.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Key as reported for a document of `member`.
    pub fn qualify_key(&self, member: &dyn SearchIndex, key: &str) -> String {
        if self.is_virtual {
            format!("{}/{key}", member.name())
        } else {
            key.to_string()
        }
    }
}
