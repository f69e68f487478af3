//! Unresolved values and property trees
//!
//! A [`Token`] stands for a value only known once the template is deployed
//! (a physical id, an ARN, the region). Components build [`Prop`] trees out of
//! literals and tokens; synthesis turns them into CloudFormation intrinsics.

use std::collections::BTreeMap;
use std::fmt;

/// Reference to a resource declared in a stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    /// Owning stack name
    pub stack: String,
    /// Logical id inside the owning stack
    pub logical_id: String,
}

impl ResourceRef {
    pub fn new(stack: impl Into<String>, logical_id: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            logical_id: logical_id.into(),
        }
    }

    /// `Ref` of this resource
    pub fn reference(&self) -> Token {
        Token::Ref(self.clone())
    }

    /// `Fn::GetAtt` of this resource
    pub fn get_att(&self, attribute: impl Into<String>) -> Token {
        Token::GetAtt {
            target: self.clone(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stack, self.logical_id)
    }
}

/// Deploy-time pseudo parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pseudo {
    AccountId,
    Region,
    Partition,
    UrlSuffix,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::Region => "AWS::Region",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// A string value that may depend on deploy-time attributes
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Literal(String),
    Ref(ResourceRef),
    GetAtt { target: ResourceRef, attribute: String },
    Pseudo(Pseudo),
    /// String concatenation of the parts
    Concat(Vec<Token>),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    /// Concatenate parts, flattening nested concatenations and merging
    /// adjacent literals. A single remaining part is returned as-is.
    pub fn concat(parts: impl IntoIterator<Item = Token>) -> Self {
        let mut flat: Vec<Token> = Vec::new();
        for part in parts {
            let inner = match part {
                Token::Concat(inner) => inner,
                other => vec![other],
            };
            for token in inner {
                if let Token::Literal(s) = &token {
                    if s.is_empty() {
                        continue;
                    }
                    if let Some(Token::Literal(prev)) = flat.last_mut() {
                        prev.push_str(s);
                        continue;
                    }
                }
                flat.push(token);
            }
        }

        match flat.len() {
            0 => Token::Literal(String::new()),
            1 => flat.remove(0),
            _ => Token::Concat(flat),
        }
    }

    /// Remove a literal suffix from the end of the token, if present
    pub fn strip_suffix(&self, suffix: &str) -> Option<Token> {
        match self {
            Token::Literal(s) => s.strip_suffix(suffix).map(Token::literal),
            Token::Concat(parts) => {
                let (last, head) = parts.split_last()?;
                let stripped = last.strip_suffix(suffix)?;
                Some(Token::concat(head.iter().cloned().chain([stripped])))
            }
            _ => None,
        }
    }

    /// Literal value, when the token does not depend on deploy-time state
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Token::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Visit every resource referenced by this token
    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a ResourceRef)) {
        match self {
            Token::Ref(target) | Token::GetAtt { target, .. } => f(target),
            Token::Concat(parts) => parts.iter().for_each(|p| p.visit_refs(f)),
            Token::Literal(_) | Token::Pseudo(_) => {}
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Literal(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

impl From<Pseudo> for Token {
    fn from(value: Pseudo) -> Self {
        Token::Pseudo(value)
    }
}

/// Renders in `Fn::Sub` notation, e.g. `https://${ApiGatewayStack.AppApi}.execute-api.${AWS::Region}`
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(s) => f.write_str(s),
            Token::Ref(target) => write!(f, "${{{}.{}}}", target.stack, target.logical_id),
            Token::GetAtt { target, attribute } => {
                write!(f, "${{{}.{}.{}}}", target.stack, target.logical_id, attribute)
            }
            Token::Pseudo(p) => write!(f, "${{{}}}", p.as_str()),
            Token::Concat(parts) => parts.iter().try_for_each(|p| write!(f, "{}", p)),
        }
    }
}

/// Resource property tree
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<Prop>),
    Map(BTreeMap<String, Prop>),
    Token(Token),
}

impl Prop {
    /// Build a map property from key/value pairs
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Prop)>) -> Self {
        Prop::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// `{}`
    pub fn empty_map() -> Self {
        Prop::Map(BTreeMap::new())
    }

    /// Build a list property
    pub fn list<T: Into<Prop>>(items: impl IntoIterator<Item = T>) -> Self {
        Prop::List(items.into_iter().map(Into::into).collect())
    }

    /// Look up a key of a map property
    pub fn get(&self, key: &str) -> Option<&Prop> {
        match self {
            Prop::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Index into a list property
    pub fn at(&self, index: usize) -> Option<&Prop> {
        match self {
            Prop::List(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Prop::Str(s) => Some(s),
            Prop::Token(t) => t.as_literal(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Prop]> {
        match self {
            Prop::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Prop::Token(t) => Some(t),
            _ => None,
        }
    }

    /// Visit every resource referenced anywhere in the tree
    pub fn visit_refs<'a>(&'a self, f: &mut impl FnMut(&'a ResourceRef)) {
        match self {
            Prop::Token(t) => t.visit_refs(f),
            Prop::List(items) => items.iter().for_each(|p| p.visit_refs(f)),
            Prop::Map(entries) => entries.values().for_each(|p| p.visit_refs(f)),
            Prop::Str(_) | Prop::Bool(_) | Prop::Int(_) => {}
        }
    }
}

impl From<&str> for Prop {
    fn from(value: &str) -> Self {
        Prop::Str(value.to_string())
    }
}

impl From<String> for Prop {
    fn from(value: String) -> Self {
        Prop::Str(value)
    }
}

impl From<&String> for Prop {
    fn from(value: &String) -> Self {
        Prop::Str(value.clone())
    }
}

impl From<bool> for Prop {
    fn from(value: bool) -> Self {
        Prop::Bool(value)
    }
}

impl From<i64> for Prop {
    fn from(value: i64) -> Self {
        Prop::Int(value)
    }
}

impl From<u32> for Prop {
    fn from(value: u32) -> Self {
        Prop::Int(i64::from(value))
    }
}

impl From<Token> for Prop {
    fn from(value: Token) -> Self {
        match value {
            Token::Literal(s) => Prop::Str(s),
            other => Prop::Token(other),
        }
    }
}

impl From<Vec<Prop>> for Prop {
    fn from(value: Vec<Prop>) -> Self {
        Prop::List(value)
    }
}
