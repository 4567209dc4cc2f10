// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Column name resolution from field tags.
//!
//! With the default syntax a field tagged `#[tag(db = "col=user_id")]`
//! maps to column `user_id`. The tag value is split on whitespace into
//! `key=value` tokens; tokens with other keys are ignored, so one tag can
//! carry unrelated options (`"col=user_id pk"`).

use crate::config::Config;
use crate::record::FieldDescriptor;

/// Resolved column name of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTag {
    pub name: String,
    /// True when the name came from a tag override
    pub explicit: bool,
}

/// Tag syntax borrowed from the configuration
#[derive(Debug, Clone, Copy)]
pub struct TagParser<'a> {
    tag_name: &'a str,
    key: &'a str,
    separator: &'a str,
}

impl<'a> TagParser<'a> {
    pub fn new(tag_name: &'a str, key: &'a str, separator: &'a str) -> Self {
        Self {
            tag_name,
            key,
            separator,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(&config.tag_name, &config.tag_key, &config.tag_separator)
    }

    /// Column override carried by a raw tag value, if any.
    pub fn parse(&self, raw: &str) -> Option<String> {
        raw.split_whitespace().find_map(|token| {
            let mut parts = token.split(self.separator);
            if parts.next() == Some(self.key) {
                Some(parts.next().unwrap_or_default().to_string())
            } else {
                None
            }
        })
    }

    /// Column name of `field`: the tag override, else the lowercase field
    /// name. Returns the offending name when it is empty or not lowercase.
    pub fn column(&self, field: &FieldDescriptor) -> Result<ColumnTag, String> {
        let tag = match field.tag(self.tag_name).and_then(|raw| self.parse(raw)) {
            Some(name) => ColumnTag {
                name,
                explicit: true,
            },
            None => ColumnTag {
                name: field.name.to_lowercase(),
                explicit: false,
            },
        };

        if tag.name.is_empty() || tag.name.to_lowercase() != tag.name {
            return Err(tag.name);
        }
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;
    use std::any::Any;

    fn get(_: &dyn Any) -> Option<&dyn Any> {
        None
    }

    fn get_mut(_: &mut dyn Any) -> Option<&mut dyn Any> {
        None
    }

    fn field(name: &'static str, tags: &'static [(&'static str, &'static str)]) -> FieldDescriptor {
        FieldDescriptor {
            name,
            tags,
            shape: i64::shape,
            get,
            get_mut,
        }
    }

    #[test]
    fn test_default_column_is_lowercase_name() {
        let parser = TagParser::new("db", "col", "=");
        let tag = parser.column(&field("UserId", &[])).unwrap();
        assert_eq!(tag.name, "userid");
        assert!(!tag.explicit);
    }

    #[test]
    fn test_override_among_other_tokens() {
        let parser = TagParser::new("db", "col", "=");
        let tag = parser
            .column(&field("id", &[("db", "pk col=item_id auto")]))
            .unwrap();
        assert_eq!(tag.name, "item_id");
        assert!(tag.explicit);
    }

    #[test]
    fn test_other_tag_names_ignored() {
        let parser = TagParser::new("db", "col", "=");
        let tag = parser
            .column(&field("name", &[("json", "col=label")]))
            .unwrap();
        assert_eq!(tag.name, "name");
    }

    #[test]
    fn test_bad_override_rejected() {
        let parser = TagParser::new("db", "col", "=");
        assert_eq!(
            parser.column(&field("id", &[("db", "col=ItemId")])),
            Err("ItemId".to_string())
        );
        assert_eq!(parser.column(&field("id", &[("db", "col=")])), Err(String::new()));
        assert_eq!(parser.column(&field("id", &[("db", "col")])), Err(String::new()));
    }

    #[test]
    fn test_custom_syntax() {
        let config = Config::builder()
            .tag_name("sql")
            .tag_key("column")
            .tag_separator(":")
            .build();
        let parser = TagParser::from_config(&config);
        let tag = parser
            .column(&field("id", &[("db", "col=nope"), ("sql", "column:ident")]))
            .unwrap();
        assert_eq!(tag.name, "ident");
    }
}
