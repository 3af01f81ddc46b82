use std::sync::{Arc, LazyLock};

use itertools::Itertools;
use log::{debug, trace, warn};

use crate::{
    Error, Expression, Feature, Properties, Value,
    ast::{
        constants,
        parser::{Parser, ParserOptions},
    },
    cache::{CachePolicy, CacheStats, EngineCache},
    compiler::{self, Node},
    defines::Defines,
    eval::Evaluator,
    feature::EMPTY_PROPERTIES,
    normalize,
    variable::{LiteralBinding, Rewrite},
};

static GLOBAL_ENGINE: LazyLock<Engine> = LazyLock::new(Engine::default);

/// Configuration options for the engine.
#[derive(Debug, Clone)]
pub struct Options {
    /// Eviction policy shared by every cache of the engine.
    pub cache_policy: CachePolicy,
    /// Operator table and named literals of the grammar.
    pub parser: ParserOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::default(),
            parser: ParserOptions::default()
                .binary_operator(constants::MATCH, constants::EQUALITY_PRECEDENCE)
                .binary_operator(constants::NOT_MATCH, constants::EQUALITY_PRECEDENCE),
        }
    }
}

impl Options {
    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn binary_operator(mut self, symbol: &str, precedence: u8) -> Self {
        self.parser = self.parser.binary_operator(symbol, precedence);
        self
    }
}

/// Compiles expression texts into shared runtime trees and evaluates them.
///
/// Each engine owns its caches. Texts compiled through the same engine share
/// one tree across all features; [`Engine::global`] is the engine behind
/// [`Expression::new`].
///
/// ```rust
/// use stylex_lang::{Defines, Engine, Feature, Value};
///
/// let engine = stylex_lang::Engine::default();
/// let feature: Feature = [("height", 120)].into_iter().collect();
///
/// let expression = engine
///     .expression("height > 100 ? 'tall' : 'short'", Some(&feature), &Defines::new())
///     .unwrap();
/// assert_eq!(expression.evaluate(), Ok(Value::from("tall")));
/// ```
#[derive(Debug)]
pub struct Engine {
    parser: Parser,
    cache: EngineCache,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Engine {
    pub fn new(options: Options) -> Self {
        Self {
            parser: Parser::new(options.parser),
            cache: EngineCache::new(options.cache_policy),
        }
    }

    /// The process-wide engine with default options.
    pub fn global() -> &'static Engine {
        &GLOBAL_ENGINE
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.counters.snapshot()
    }

    /// Strips escape backslashes in front of quotes, memoized by text.
    pub fn normalize(&self, text: &str) -> String {
        if let Some(normalized) = self.cache.normalized.get(text) {
            return normalized;
        }

        let normalized = normalize::normalize(text);
        let evicted = self
            .cache
            .normalized
            .insert(text.to_string(), normalized.clone());
        self.cache.counters.evicted(evicted);
        normalized
    }

    /// Replaces every defined name in `text` with its parenthesized value.
    pub fn substitute_defines(&self, text: &str, defines: &Defines) -> String {
        if defines.is_empty() {
            return text.to_string();
        }

        let key = (defines.signature(), text.to_string());
        if let Some(substituted) = self.cache.defines.get(&key) {
            return substituted;
        }

        let pattern = match self.define_pattern(defines) {
            Some(pattern) => pattern,
            None => return text.to_string(),
        };

        let substituted = defines.substitute(text, &pattern);
        let evicted = self.cache.defines.insert(key, substituted.clone());
        self.cache.counters.evicted(evicted);
        substituted
    }

    fn define_pattern(&self, defines: &Defines) -> Option<Arc<regex_lite::Regex>> {
        let key = defines.key_signature();
        if let Some(pattern) = self.cache.patterns.get(&key) {
            return Some(pattern);
        }

        match defines.pattern() {
            Ok(pattern) => {
                let pattern = Arc::new(pattern);
                let evicted = self.cache.patterns.insert(key, Arc::clone(&pattern));
                self.cache.counters.evicted(evicted);
                Some(pattern)
            }
            Err(err) => {
                warn!("skipping define substitution: {}", err);
                None
            }
        }
    }

    fn rewrite(&self, text: &str) -> Option<Arc<Rewrite>> {
        if let Some(rewrite) = self.cache.variables.get(text) {
            return Some(rewrite);
        }

        let rewrite = Arc::new(Rewrite::scan(text)?);
        let evicted = self
            .cache
            .variables
            .insert(text.to_string(), Arc::clone(&rewrite));
        self.cache.counters.evicted(evicted);
        Some(rewrite)
    }

    /// Replaces `${path}` references with synthetic identifiers and binds
    /// each one to its value in `properties`.
    pub fn replace_variables(
        &self,
        text: &str,
        properties: &Properties,
    ) -> (String, Vec<LiteralBinding>) {
        match self.rewrite(text) {
            Some(rewrite) => (rewrite.text.clone(), rewrite.bind(properties)),
            None => (text.to_string(), Vec::new()),
        }
    }

    /// Parses and lowers `text`, or returns the tree already compiled for it.
    ///
    /// A failed parse leaves no cache entry behind.
    pub fn compile(&self, text: &str, bindings: &[LiteralBinding]) -> Result<Arc<Node>, Error> {
        let key = ast_key(text, bindings);

        if let Some(node) = self.cache.ast.get(&key) {
            trace!("AST cache hit: {}", text);
            self.cache.counters.ast_hit();
            return Ok(node);
        }

        self.cache.counters.ast_miss();
        self.cache.counters.parse();

        let raw = self
            .parser
            .parse(text, bindings)
            .map_err(|err| Error::from_error(text, err))?;
        let node = Arc::new(compiler::compile(&raw));

        debug!("compiled expression: {}", text);
        let evicted = self.cache.ast.insert(key, Arc::clone(&node));
        self.cache.counters.evicted(evicted);
        if evicted > 0 {
            trace!("evicted {} cache entries", evicted);
        }

        Ok(node)
    }

    /// Runs the whole pipeline and returns an expression bound to `feature`.
    pub fn expression<'a>(
        &self,
        text: &str,
        feature: Option<&'a Feature>,
        defines: &Defines,
    ) -> Result<Expression<'a>, Error> {
        let properties = feature.map_or(&EMPTY_PROPERTIES, Feature::properties);
        let text = self.substitute_defines(&self.normalize(text), defines);
        let (text, bindings) = self.replace_variables(&text, properties);
        let node = self.compile(&text, &bindings)?;

        Ok(Expression::from_parts(
            text,
            node,
            bindings,
            feature,
            Arc::clone(&self.cache.regexes),
        ))
    }

    /// Evicts the variable rewrite and the compiled tree that `expression`
    /// would use for these inputs. Returns whether anything was evicted.
    pub fn clear_expression_caches(
        &self,
        text: &str,
        feature: Option<&Feature>,
        defines: &Defines,
    ) -> bool {
        let properties = feature.map_or(&EMPTY_PROPERTIES, Feature::properties);
        let text = self.substitute_defines(&self.normalize(text), defines);

        let rewrite = self
            .cache
            .variables
            .get(&text)
            .or_else(|| Rewrite::scan(&text).map(Arc::new));
        let (final_text, bindings) = match &rewrite {
            Some(rewrite) => (rewrite.text.as_str(), rewrite.bind(properties)),
            None => (text.as_str(), Vec::new()),
        };

        let ast = self.cache.ast.remove(&ast_key(final_text, &bindings));
        let variables = self.cache.variables.remove(&text);
        if ast || variables {
            debug!("cleared caches for expression: {}", text);
        }

        ast || variables
    }

    /// Compiles `text` once and evaluates it against every feature.
    ///
    /// Fails as a whole only when the text does not parse; evaluation errors
    /// are reported per feature.
    pub fn evaluate_batch(
        &self,
        text: &str,
        features: &[Feature],
        defines: &Defines,
    ) -> Result<Vec<Result<Value, Error>>, Error> {
        let text = self.substitute_defines(&self.normalize(text), defines);
        let rewrite = self.rewrite(&text);
        let final_text = rewrite.as_ref().map_or(text.as_str(), |r| r.text.as_str());

        let names = rewrite
            .as_ref()
            .map(|rewrite| rewrite.bind(&EMPTY_PROPERTIES))
            .unwrap_or_default();
        let node = self.compile(final_text, &names)?;

        Ok(features
            .iter()
            .map(|feature| {
                let bindings = rewrite
                    .as_ref()
                    .map(|rewrite| rewrite.bind(feature.properties()))
                    .unwrap_or_default();
                Evaluator::new(feature.properties(), &bindings, &self.cache.regexes)
                    .eval(&node)
                    .map_err(|err| Error::from_error(final_text, err))
            })
            .collect())
    }
}

// Identifiers parse differently depending on which names are bound, so the
// bound names are part of the key.
fn ast_key(text: &str, bindings: &[LiteralBinding]) -> String {
    if bindings.is_empty() {
        text.to_string()
    } else {
        format!(
            "{}\u{0}{}",
            text,
            bindings.iter().map(|binding| &binding.name).join(",")
        )
    }
}
