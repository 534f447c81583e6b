use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dom::dom_model::NodeId;
use crate::state::normalize::UNNAMED_FIELD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    ShortText,
    Email,
    Phone,
    Url,
    Numeric,
    Date,
    LongText,
    SingleSelect,
    #[serde(rename = "multi-select-radio-group")]
    RadioGroup,
    Checkbox,
    File,
    UnsupportedOther,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::ShortText => "short-text",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Url => "url",
            FieldType::Numeric => "numeric",
            FieldType::Date => "date",
            FieldType::LongText => "long-text",
            FieldType::SingleSelect => "single-select",
            FieldType::RadioGroup => "multi-select-radio-group",
            FieldType::Checkbox => "checkbox",
            FieldType::File => "file",
            FieldType::UnsupportedOther => "unsupported-other",
        }
    }

    /// Filled by writing a string value.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            FieldType::ShortText
                | FieldType::Email
                | FieldType::Phone
                | FieldType::Url
                | FieldType::Numeric
                | FieldType::Date
                | FieldType::LongText
        )
    }
}

/// Which step of the label chain produced a field's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    AriaLabelledBy,
    ExplicitLabel,
    WrappingLabel,
    Legend,
    QuestionGroup,
    AriaLabel,
    Placeholder,
    Name,
    Unnamed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
    /// Backing element (native `<option>`, radio input, or ARIA option).
    #[serde(skip)]
    pub node: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    pub required: bool,
}

/// One logical question on the page.
///
/// `element` is a handle into the document the field was extracted from; it
/// does not keep the element alive and must be re-validated before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: Option<String>,
    pub html_id: Option<String>,
    pub label: String,
    pub label_source: LabelSource,
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: Option<String>,
    pub options: Vec<FieldOption>,
    pub current_value: String,
    pub validation: ValidationRules,
    pub element: NodeId,
}

impl Field {
    pub fn has_usable_label(&self) -> bool {
        self.label_source != LabelSource::Unnamed && self.label != UNNAMED_FIELD
    }

    /// Every element backing this field (radio members included).
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = vec![self.element];
        if self.field_type == FieldType::RadioGroup {
            out.extend(self.options.iter().filter_map(|o| o.node));
        }
        out.dedup();
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerOrigin {
    Native,
    Virtual,
}

/// Signals contributing to a container's application-form score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ScoreSignal {
    FileUpload,
    LongText,
    Keyword(String),
    WorkHistory(String),
    FieldCount(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRef {
    pub node: NodeId,
    pub label: String,
}

/// A detected form instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub root: NodeId,
    pub origin: ContainerOrigin,
    pub fields: Vec<Field>,
    pub score: f32,
    pub indicators: Vec<ScoreSignal>,
    pub submit_control: Option<ControlRef>,
}

impl Container {
    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// Result of one page scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub url: String,
    pub domain: Option<String>,
    pub title: String,
    pub company: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub containers: Vec<Container>,
}

impl DetectionRecord {
    pub fn primary(&self) -> Option<&Container> {
        self.containers.first()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
