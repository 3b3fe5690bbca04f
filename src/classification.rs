use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// One facet of a classification (base type, sub type, or style).
///
/// The platform reports an empty `value` for facets it could not infer;
/// those are treated the same as absent facets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub value: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Facet {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confidence: None,
        }
    }

    fn present(&self) -> Option<&str> {
        if self.value.is_empty() {
            None
        } else {
            Some(&self.value)
        }
    }
}

/// The inferred intent of an inbound message, as produced by the NLP layer.
///
/// The engine never inspects classifications beyond deriving the three
/// string projections used as routing-table keys: [`display`], [`without_style`]
/// and the bare base type.
///
/// [`display`]: Classification::display
/// [`without_style`]: Classification::without_style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub base_type: Facet,
    #[serde(default)]
    pub sub_type: Option<Facet>,
    #[serde(default)]
    pub style: Option<Facet>,
}

impl Classification {
    pub fn new(base_type: impl Into<String>) -> Self {
        Self {
            base_type: Facet::new(base_type),
            sub_type: None,
            style: None,
        }
    }

    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(Facet::new(sub_type));
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(Facet::new(style));
        self
    }

    /// Full projection: `base/sub#style`, omitting absent facets.
    pub fn display(&self) -> String {
        let mut display = self.without_style();
        if let Some(style) = self.style.as_ref().and_then(Facet::present) {
            display.push('#');
            display.push_str(style);
        }
        display
    }

    /// Projection without the style facet: `base/sub`.
    pub fn without_style(&self) -> String {
        let mut key = self.base_type.value.clone();
        if let Some(sub) = self.sub_type.as_ref().and_then(Facet::present) {
            key.push('/');
            key.push_str(sub);
        }
        key
    }

    pub fn base(&self) -> &str {
        &self.base_type.value
    }
}

/// The three lookup keys derived from the current message's classification,
/// computed once per turn and reused for every routing-table probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationKeys {
    pub display: Option<String>,
    pub without_style: Option<String>,
    pub base_type: Option<String>,
}

impl ClassificationKeys {
    pub fn new(classification: Option<&Classification>) -> Self {
        match classification {
            Some(c) => Self {
                display: Some(c.display()),
                without_style: Some(c.without_style()),
                base_type: Some(c.base().to_string()),
            },
            None => Self::default(),
        }
    }

    /// Probes a routing table with the most specific key first:
    /// display, then without-style, then base type.
    pub fn lookup<'a, V>(&self, table: &'a AHashMap<String, V>) -> Option<&'a V> {
        [&self.display, &self.without_style, &self.base_type]
            .into_iter()
            .flatten()
            .find_map(|key| table.get(key.as_str()))
    }
}

/// A prediction about the next message in the conversation, used to gate
/// the auto-responder. Consumed at most once per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// `"input"` when more user input is expected, `"output"` when the
    /// platform predicts the app's next response.
    pub direction: Facet,
    pub base_type: Facet,
    pub sub_type: Facet,
    pub overall_confidence: f64,
    #[serde(default)]
    pub predicted_response: Option<PredictedResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedResponse {
    #[serde(default)]
    pub auto_fill_capable: bool,
}
