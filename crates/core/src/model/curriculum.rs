use std::collections::BTreeMap;
use std::collections::HashSet;

use thiserror::Error;

use crate::model::topic::{PathName, Topic};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("curriculum has no paths")]
    Empty,

    #[error("path {0} has no topics")]
    EmptyPath(PathName),

    #[error("path {path} lists topic {topic} more than once")]
    DuplicateTopic { path: PathName, topic: Topic },

    #[error("path {0} is defined more than once")]
    DuplicatePath(PathName),

    #[error("no curriculum definition for path {0}")]
    UnknownPath(PathName),
}

/// The ordered topics of one path. Order defines the unlock chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSequence {
    path: PathName,
    topics: Vec<Topic>,
}

impl TopicSequence {
    /// Build a sequence, rejecting empty paths and repeated topics.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::EmptyPath` or `CurriculumError::DuplicateTopic`.
    pub fn new(path: PathName, topics: Vec<Topic>) -> Result<Self, CurriculumError> {
        if topics.is_empty() {
            return Err(CurriculumError::EmptyPath(path));
        }
        let mut seen = HashSet::with_capacity(topics.len());
        for topic in &topics {
            if !seen.insert(topic) {
                return Err(CurriculumError::DuplicateTopic {
                    path,
                    topic: topic.clone(),
                });
            }
        }
        Ok(Self { path, topics })
    }

    /// Static lists are checked by `builtin_lists_are_valid`.
    fn from_static(path: PathName, topics: &[&str]) -> Self {
        Self {
            path,
            topics: topics
                .iter()
                .map(|t| Topic((*t).to_string()))
                .collect(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &PathName {
        &self.path
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Topic> {
        self.topics.get(index)
    }

    #[must_use]
    pub fn position(&self, topic: &Topic) -> Option<usize> {
        self.topics.iter().position(|t| t == topic)
    }

    #[must_use]
    pub fn contains(&self, topic: &Topic) -> bool {
        self.position(topic).is_some()
    }
}

/// Named set of ordered topic sequences. Static for the lifetime of the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curriculum {
    paths: BTreeMap<PathName, TopicSequence>,
}

impl Curriculum {
    /// Assemble a curriculum from its sequences.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::Empty` with no sequences and
    /// `CurriculumError::DuplicatePath` when two sequences share a name.
    pub fn new(sequences: impl IntoIterator<Item = TopicSequence>) -> Result<Self, CurriculumError> {
        let mut paths = BTreeMap::new();
        for sequence in sequences {
            let name = sequence.path.clone();
            if paths.insert(name.clone(), sequence).is_some() {
                return Err(CurriculumError::DuplicatePath(name));
            }
        }
        if paths.is_empty() {
            return Err(CurriculumError::Empty);
        }
        Ok(Self { paths })
    }

    /// The shipped two-path curriculum (`css`, `javascript`).
    #[must_use]
    pub fn builtin() -> Self {
        let mut paths = BTreeMap::new();
        paths.insert(
            PathName::css(),
            TopicSequence::from_static(PathName::css(), &CSS_TOPICS),
        );
        paths.insert(
            PathName::javascript(),
            TopicSequence::from_static(PathName::javascript(), &JAVASCRIPT_TOPICS),
        );
        Self { paths }
    }

    /// Look up a path, failing loudly when it is not defined.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::UnknownPath` if the path is missing.
    pub fn require(&self, path: &PathName) -> Result<&TopicSequence, CurriculumError> {
        self.paths
            .get(path)
            .ok_or_else(|| CurriculumError::UnknownPath(path.clone()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathName> {
        self.paths.keys()
    }

    pub fn sequences(&self) -> impl Iterator<Item = &TopicSequence> {
        self.paths.values()
    }

    /// Topic count summed over every path.
    #[must_use]
    pub fn total_topics(&self) -> usize {
        self.paths.values().map(TopicSequence::len).sum()
    }
}

const CSS_TOPICS: [&str; 52] = [
    "CSS Introduction",
    "Inline CSS",
    "Internal CSS",
    "External CSS",
    "CSS Selectors",
    "CSS Colors",
    "CSS Backgrounds",
    "CSS Borders",
    "CSS Margins",
    "CSS Padding",
    "CSS Height and Width",
    "CSS Box Model",
    "CSS Outline",
    "CSS Text",
    "CSS Fonts",
    "CSS Icons",
    "CSS Links",
    "CSS Lists",
    "CSS Tables",
    "CSS Display",
    "CSS Max-width",
    "CSS Position",
    "CSS Z-index",
    "CSS Overflow",
    "CSS Float",
    "CSS Inline-block",
    "CSS Align",
    "CSS Combinators",
    "CSS Pseudo-class",
    "CSS Pseudo-element",
    "CSS Opacity",
    "CSS Navigation Bar",
    "CSS Dropdowns",
    "CSS Image Gallery",
    "CSS Image Sprites",
    "CSS Attr Selectors",
    "CSS Forms",
    "CSS Counters",
    "CSS Website Layout",
    "CSS Units",
    "CSS Specificity",
    "CSS !important",
    "CSS Math Functions",
    "CSS Variables",
    "CSS Box Sizing",
    "CSS Media Queries",
    "CSS MQ Examples",
    "CSS Flexbox",
    "CSS Responsive",
    "CSS Grid",
    "CSS SASS",
    "CSS Examples",
];

const JAVASCRIPT_TOPICS: [&str; 78] = [
    "JavaScript Introduction",
    "JavaScript Where To",
    "JavaScript Output",
    "JavaScript Variables",
    "JavaScript Let",
    "JavaScript Const",
    "JavaScript Operators",
    "JavaScript Arithmetic",
    "JavaScript Assignment",
    "JavaScript Data Types",
    "JavaScript Functions",
    "JavaScript Objects",
    "JavaScript Events",
    "JavaScript Strings",
    "JavaScript String Methods",
    "JavaScript String Search",
    "JavaScript String Templates",
    "JavaScript Numbers",
    "JavaScript Number Methods",
    "JavaScript Arrays",
    "JavaScript Array Methods",
    "JavaScript Array Sort",
    "JavaScript Array Iteration",
    "JavaScript Array Const",
    "JavaScript Dates",
    "JavaScript Date Formats",
    "JavaScript Date Get Methods",
    "JavaScript Date Set Methods",
    "JavaScript Math",
    "JavaScript Random",
    "JavaScript Booleans",
    "JavaScript Comparisons",
    "JavaScript If Else",
    "JavaScript Switch",
    "JavaScript For Loop",
    "JavaScript For In",
    "JavaScript For Of",
    "JavaScript While Loop",
    "JavaScript Break",
    "JavaScript Iterables",
    "JavaScript Sets",
    "JavaScript Maps",
    "JavaScript Typeof",
    "JavaScript Type Conversion",
    "JavaScript Bitwise",
    "JavaScript RegExp",
    "JavaScript Errors",
    "JavaScript Scope",
    "JavaScript Hoisting",
    "JavaScript Strict Mode",
    "JavaScript this Keyword",
    "JavaScript Arrow Function",
    "JavaScript Classes",
    "JavaScript Modules",
    "JavaScript JSON",
    "JavaScript Debugging",
    "JavaScript Style Guide",
    "JavaScript Best Practices",
    "JavaScript Mistakes",
    "JavaScript Performance",
    "JavaScript Reserved Words",
    "JavaScript Versions",
    "JavaScript ES5",
    "JavaScript ES6",
    "JavaScript JSON Advanced",
    "JavaScript Forms",
    "JavaScript Object Definitions",
    "JavaScript Function Definitions",
    "JavaScript HTML DOM",
    "JavaScript Browser BOM",
    "JavaScript AJAX",
    "JavaScript vs jQuery",
    "JavaScript Graphics",
    "JavaScript Canvas",
    "JavaScript Plotly",
    "JavaScript Chart.js",
    "JavaScript Google Chart",
    "JavaScript Examples",
];
