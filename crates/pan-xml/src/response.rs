use xmltree::Element;
use zone_engine::RuleRecord;

use crate::error::ResponseError;
use crate::tree::{child, children, rule_records, text, walk};
use crate::DeviceType;
use zone_engine::PathStep;

/// A parsed `<response status="...">` envelope from the management API.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    root: Element,
}

impl ApiResponse {
    pub fn parse(body: &str) -> Result<Self, ResponseError> {
        let root = Element::parse(body.as_bytes())?;
        if root.name != "response" {
            return Err(ResponseError::UnexpectedRoot(root.name));
        }
        Ok(Self { root })
    }

    pub fn status(&self) -> Option<&str> {
        self.root.attributes.get("status").map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some("success")
    }

    /// The device's explanation of a failure, flattened to one line.
    ///
    /// Messages appear either as `<msg>text</msg>` or as nested
    /// `<msg><line>..</line></msg>` / `<result><msg>..</msg></result>`.
    pub fn message(&self) -> String {
        let msg = child(&self.root, "msg", None)
            .or_else(|| child(&self.root, "result", None).and_then(|r| child(r, "msg", None)));
        let Some(msg) = msg else {
            return format!("status={}", self.status().unwrap_or("unknown"));
        };
        let lines: Vec<String> = children(msg, "line").map(text).collect();
        if lines.is_empty() {
            text(msg).trim().to_string()
        } else {
            lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("; ")
        }
    }

    /// `response/result/key` of a keygen call.
    pub fn api_key(&self) -> Result<String, ResponseError> {
        walk(&self.root, &[PathStep::tag("result"), PathStep::tag("key")])
            .map(text)
            .filter(|k| !k.is_empty())
            .ok_or(ResponseError::Missing("result/key"))
    }

    /// Device type implied by a `get` of `/config/devices/entry/device-group`.
    pub fn device_type(&self) -> DeviceType {
        if self.device_groups().is_empty() {
            DeviceType::Firewall
        } else {
            DeviceType::Panorama
        }
    }

    /// Names of `response/result/device-group/entry` nodes.
    pub fn device_groups(&self) -> Vec<String> {
        walk(
            &self.root,
            &[PathStep::tag("result"), PathStep::tag("device-group")],
        )
        .map(|dg| {
            children(dg, "entry")
                .filter_map(|e| e.attributes.get("name").cloned())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Rules under `response/result/rules`. Empty when the rulebase has none.
    pub fn rules(&self) -> Vec<RuleRecord> {
        walk(&self.root, &[PathStep::tag("result"), PathStep::tag("rules")])
            .map(rule_records)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keygen_success() {
        let r = ApiResponse::parse(
            r#"<response status="success"><result><key>LUFRPT1abc==</key></result></response>"#,
        )
        .unwrap();
        assert!(r.is_success());
        assert_eq!(r.api_key().unwrap(), "LUFRPT1abc==");
    }

    #[test]
    fn keygen_failure_message() {
        let r = ApiResponse::parse(
            r#"<response status="error" code="403"><result><msg>Invalid Credential</msg></result></response>"#,
        )
        .unwrap();
        assert!(!r.is_success());
        assert_eq!(r.message(), "Invalid Credential");
        assert!(r.api_key().is_err());
    }

    #[test]
    fn multi_line_message() {
        let r = ApiResponse::parse(
            r#"<response status="error" code="12"><msg><line>rules -> r1 -> to 'x' is not a valid reference</line><line>rules is invalid</line></msg></response>"#,
        )
        .unwrap();
        assert_eq!(
            r.message(),
            "rules -> r1 -> to 'x' is not a valid reference; rules is invalid"
        );
    }

    #[test]
    fn non_response_root_is_rejected() {
        let err = ApiResponse::parse("<html><body/></html>").unwrap_err();
        assert!(err.to_string().contains("unexpected response root <html>"));
    }

    #[test]
    fn device_groups_detect_panorama() {
        let r = ApiResponse::parse(
            r#"<response status="success"><result total-count="1" count="1">
                 <device-group><entry name="dg-east"/><entry name="dg-west"/></device-group>
               </result></response>"#,
        )
        .unwrap();
        assert_eq!(r.device_groups(), vec!["dg-east", "dg-west"]);
        assert_eq!(r.device_type(), DeviceType::Panorama);
    }

    #[test]
    fn empty_result_is_firewall() {
        let r = ApiResponse::parse(r#"<response status="success"><result/></response>"#).unwrap();
        assert_eq!(r.device_type(), DeviceType::Firewall);
        assert!(r.rules().is_empty());
    }

    #[test]
    fn rules_from_get() {
        let r = ApiResponse::parse(
            r#"<response status="success"><result><rules>
                 <entry name="allow-web"><to><member>dmz</member></to><from><member>trust</member></from></entry>
               </rules></result></response>"#,
        )
        .unwrap();
        assert_eq!(r.rules(), vec![RuleRecord::new("allow-web", ["dmz"], ["trust"])]);
    }
}
