use serde::Deserialize;

use acc_unlock_core::model::{FolderRef, ItemEntry};

/// A JSON:API collection document, as returned by the Data Management API.
#[derive(Debug, Deserialize)]
pub(crate) struct Document {
    #[serde(default)]
    pub data: Vec<Resource>,
    #[serde(default)]
    pub links: Option<Links>,
}

impl Document {
    pub fn next_page(&self) -> Option<String> {
        self.links
            .as_ref()
            .and_then(|l| l.next.as_ref())
            .map(|n| n.href.clone())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Links {
    #[serde(default)]
    pub next: Option<Link>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Link {
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Attributes {
    pub name: Option<String>,
    pub display_name: Option<String>,
}

impl Resource {
    fn label(&self, prefer_display: bool) -> String {
        let (first, second) = if prefer_display {
            (&self.attributes.display_name, &self.attributes.name)
        } else {
            (&self.attributes.name, &self.attributes.display_name)
        };
        first
            .as_ref()
            .or(second.as_ref())
            .cloned()
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn into_folder_ref(self) -> FolderRef {
        let name = self.label(false);
        FolderRef::new(self.id, name)
    }

    /// `None` for resource types that are neither folders nor items.
    pub fn into_entry(self) -> Option<ItemEntry> {
        match self.kind.as_str() {
            "folders" => {
                let name = self.label(false);
                Some(ItemEntry::folder(self.id, name))
            }
            "items" => {
                let name = self.label(true);
                Some(ItemEntry::leaf(self.id, name))
            }
            _ => None,
        }
    }
}
