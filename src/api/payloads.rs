//! Request bodies accepted by the automation endpoints.
//!
//! Every field is optional at the serde level so a missing field produces
//! `Missing field: <name>` rather than a generic JSON error.

use serde::Deserialize;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::identifier::{classify, Identifier};
use crate::library::TagAction;

pub(crate) fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::missing_field(name))
}

/// Classify raw identifiers, dropping blanks. Empty input is a 400.
pub(crate) fn identifiers(raw: Option<Vec<String>>) -> Result<Vec<Identifier>, ApiError> {
    let ids: Vec<Identifier> = required(raw, "identifiers")?
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| classify(s))
        .collect();
    if ids.is_empty() {
        return Err(ApiError::BadRequest("No identifiers provided".into()));
    }
    Ok(ids)
}

pub(crate) fn collection_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::try_parse(raw.trim()).map_err(|_| ApiError::BadRequest("Invalid collection ID".into()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddPapers {
    pub identifiers: Option<Vec<String>>,
    pub collection: Option<String>,
}

impl AddPapers {
    pub fn validate(self) -> Result<(Vec<Identifier>, Option<Uuid>), ApiError> {
        let ids = identifiers(self.identifiers)?;
        let collection = self.collection.as_deref().map(collection_id).transpose()?;
        Ok((ids, collection))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Identifiers {
    pub identifiers: Option<Vec<String>>,
}

impl Identifiers {
    pub fn validate(self) -> Result<Vec<Identifier>, ApiError> {
        identifiers(self.identifiers)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTags {
    pub identifiers: Option<Vec<String>>,
    pub action: Option<String>,
    pub tag: Option<String>,
}

impl UpdateTags {
    pub fn validate(self) -> Result<(Vec<Identifier>, TagAction, String), ApiError> {
        let ids = identifiers(self.identifiers)?;
        let action = required(self.action, "action")?;
        let action = action
            .parse::<TagAction>()
            .map_err(|a| ApiError::BadRequest(format!("Invalid action: {}", a)))?;
        let tag = required(self.tag, "tag")?;
        if tag.trim().is_empty() {
            return Err(ApiError::missing_field("tag"));
        }
        Ok((ids, action, tag.trim().to_string()))
    }
}

/// Body of the read and star endpoints; `field` names the flag.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetFlag {
    pub identifiers: Option<Vec<String>>,
    pub read: Option<bool>,
    pub starred: Option<bool>,
}

impl SetFlag {
    pub fn validate(self, field: &str) -> Result<(Vec<Identifier>, bool), ApiError> {
        let ids = identifiers(self.identifiers)?;
        let value = match field {
            "read" => self.read,
            _ => self.starred,
        };
        Ok((ids, required(value, field)?))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewComment {
    pub text: Option<String>,
    pub author: Option<String>,
}

impl NewComment {
    pub fn validate(self) -> Result<(String, Option<String>), ApiError> {
        let text = required(self.text, "text")?;
        if text.trim().is_empty() {
            return Err(ApiError::missing_field("text"));
        }
        Ok((text, self.author.filter(|a| !a.trim().is_empty())))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewCollection {
    pub name: Option<String>,
}

impl NewCollection {
    pub fn validate(self) -> Result<String, ApiError> {
        let name = required(self.name, "name")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::missing_field("name"));
        }
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: serde::de::DeserializeOwned>(json: &str) -> T {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn identifiers_are_classified() {
        let ids = parse::<Identifiers>(r#"{"identifiers": ["10.1000/x", " ", "Smith2020"]}"#)
            .validate()
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].kind(), "doi");
        assert_eq!(ids[1].kind(), "citeKey");
    }

    #[test]
    fn missing_and_empty_identifiers() {
        let missing = parse::<Identifiers>("{}").validate().unwrap_err();
        assert_eq!(missing.to_string(), "Missing field: identifiers");

        let empty = parse::<Identifiers>(r#"{"identifiers": []}"#).validate().unwrap_err();
        assert_eq!(empty.to_string(), "No identifiers provided");
    }

    #[test]
    fn tag_action_is_checked() {
        let err = parse::<UpdateTags>(r#"{"identifiers": ["a"], "action": "toggle", "tag": "x"}"#)
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid action: toggle");

        let err = parse::<UpdateTags>(r#"{"identifiers": ["a"], "action": "add"}"#)
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing field: tag");
    }

    #[test]
    fn flag_field_is_required() {
        let err = parse::<SetFlag>(r#"{"identifiers": ["a"], "starred": true}"#)
            .validate("read")
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing field: read");

        let (_, starred) = parse::<SetFlag>(r#"{"identifiers": ["a"], "starred": true}"#)
            .validate("starred")
            .unwrap();
        assert!(starred);
    }

    #[test]
    fn collection_id_must_be_uuid() {
        let err = parse::<AddPapers>(r#"{"identifiers": ["a"], "collection": "inbox"}"#)
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid collection ID");
        assert!(collection_id("6f1c3c1e-8a6b-4f59-9a53-4a5bde0e7a10").is_ok());
    }

    #[test]
    fn blank_collection_name_is_missing() {
        let err = parse::<NewCollection>(r#"{"name": "  "}"#).validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing field: name");
    }
}
