//! Profiles and the worklist that decides which profiles get loaded, in what order.

use crate::core::Environment;
use crate::core::environment::collect_list;
use crate::error::{ConfigError, Result};
use crate::sources::PropertySource;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Property listing profiles a source activates.
pub const ACTIVE_PROFILES_PROPERTY: &str = "config.profiles.active";

/// Property listing profiles a source includes.
pub const INCLUDE_PROFILES_PROPERTY: &str = "config.profiles.include";

/// Upper bound on profile tokens processed in one resolution.
pub const DEFAULT_MAX_PROFILE_ITERATIONS: usize = 256;

/// A named configuration variant.
///
/// Profiles compare and hash by name only. `is_default` marks profiles that
/// exist only because nothing was requested explicitly.
#[derive(Debug, Clone)]
pub struct Profile {
    name: String,
    is_default: bool,
}

impl Profile {
    /// An explicitly requested profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_default: false,
        }
    }

    /// A fallback profile, dropped once a real activation happens.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_default: true,
        }
    }

    /// The profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this profile is only a fallback.
    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Profile {}

impl Hash for Profile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One unit of work: the unscoped base files, or one named profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProfileToken {
    /// Files without a profile qualifier.
    Base,
    /// Files for one profile.
    Named(Profile),
}

impl ProfileToken {
    /// Token for an explicitly requested profile.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(Profile::new(name))
    }

    /// The profile, if any.
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Base => None,
            Self::Named(profile) => Some(profile),
        }
    }

    /// The profile name, if any.
    pub fn profile_name(&self) -> Option<&str> {
        self.profile().map(Profile::name)
    }

    /// Whether this token is a fallback profile.
    pub fn is_default(&self) -> bool {
        self.profile().is_some_and(Profile::is_default)
    }

    /// Key of the precedence bucket this token loads into, e.g. `profile=db`.
    pub fn bucket_key(&self) -> String {
        format!("profile={}", self.profile_name().unwrap_or(""))
    }
}

impl fmt::Display for ProfileToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => f.write_str("(base)"),
            Self::Named(profile) => write!(f, "{}", profile),
        }
    }
}

/// Result of asking the worklist to activate declared profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The profiles were queued; this was the first activation.
    Applied(Vec<Profile>),
    /// An earlier activation already happened; nothing was queued.
    Ignored(Vec<Profile>),
}

/// Stack of profile tokens still to process, plus processing history.
///
/// The most recently pushed token is processed first. Seeding pushes explicit
/// profiles in reverse, then `Base`, so base files load first and the last
/// requested profile ends up with the highest precedence.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::{Profile, ProfileToken, ProfileWorklist};
///
/// let explicit = [Profile::new("development"), Profile::new("db")];
/// let mut worklist = ProfileWorklist::seed(&explicit, &[], 16);
///
/// assert_eq!(worklist.pop().unwrap(), Some(ProfileToken::Base));
/// assert_eq!(worklist.pop().unwrap(), Some(ProfileToken::named("development")));
/// assert_eq!(worklist.pop().unwrap(), Some(ProfileToken::named("db")));
/// assert_eq!(worklist.pop().unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct ProfileWorklist {
    pending: Vec<ProfileToken>,
    processed: Vec<ProfileToken>,
    activated: bool,
    iterations: usize,
    limit: usize,
}

impl ProfileWorklist {
    /// Create an empty worklist that processes at most `limit` tokens.
    pub fn new(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            processed: Vec::new(),
            activated: false,
            iterations: 0,
            limit,
        }
    }

    /// Seed with explicit profiles, falling back to `defaults`, then `Base`.
    pub fn seed(explicit: &[Profile], defaults: &[Profile], limit: usize) -> Self {
        let mut worklist = Self::new(limit);
        worklist.push_explicit(explicit);
        if worklist.is_empty() {
            worklist.push_defaults(defaults);
        }
        worklist.push_base();
        worklist
    }

    /// Queue explicitly requested profiles; the last one is processed last.
    pub fn push_explicit(&mut self, profiles: &[Profile]) {
        for profile in profiles.iter().rev() {
            self.pending.push(ProfileToken::named(profile.name()));
        }
    }

    /// Queue fallback profiles, marked so a later activation can purge them.
    pub fn push_defaults(&mut self, profiles: &[Profile]) {
        for profile in profiles.iter().rev() {
            let token = ProfileToken::Named(Profile::fallback(profile.name()));
            if !self.pending.contains(&token) {
                self.pending.push(token);
            }
        }
    }

    /// Queue the base token so it is processed next.
    pub fn push_base(&mut self) {
        self.pending.push(ProfileToken::Base);
    }

    /// Take the next token, skipping profiles that were already processed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ProfileLimitExceeded`] once more tokens than the
    /// configured limit have been handed out.
    pub fn pop(&mut self) -> Result<Option<ProfileToken>> {
        while let Some(token) = self.pending.pop() {
            if self.is_processed(&token) {
                tracing::trace!(profile = %token, "Profile already processed, skipping");
                continue;
            }
            self.iterations += 1;
            if self.iterations > self.limit {
                return Err(ConfigError::ProfileLimitExceeded { limit: self.limit });
            }
            return Ok(Some(token));
        }
        Ok(None)
    }

    /// Record that every candidate for `token` has been loaded.
    pub fn mark_processed(&mut self, token: ProfileToken) {
        if !self.is_processed(&token) {
            self.processed.push(token);
        }
    }

    /// Whether `token` was already processed.
    pub fn is_processed(&self, token: &ProfileToken) -> bool {
        self.processed.contains(token)
    }

    /// Named profiles processed so far, in processing order.
    pub fn processed_profiles(&self) -> Vec<Profile> {
        self.processed
            .iter()
            .filter_map(ProfileToken::profile)
            .cloned()
            .collect()
    }

    /// Every processed token, in processing order.
    pub fn processed(&self) -> &[ProfileToken] {
        &self.processed
    }

    /// Pending tokens; the last element is processed next.
    pub fn pending(&self) -> &[ProfileToken] {
        &self.pending
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether an activation has already happened.
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Activate declared profiles if no activation has happened yet.
    ///
    /// On the first non-empty activation the profiles are queued (the last
    /// declared ends with the highest precedence) and pending fallback
    /// profiles are purged. Later activations are ignored.
    pub fn activate(&mut self, declared: &[Profile]) -> Activation {
        if declared.is_empty() {
            return Activation::Applied(Vec::new());
        }
        if self.activated {
            return Activation::Ignored(declared.to_vec());
        }
        let pushed = self.push_declared(declared);
        self.activated = true;
        self.pending.retain(|token| !token.is_default());
        Activation::Applied(pushed)
    }

    /// Queue included profiles. Includes never count as the activation.
    pub fn include(&mut self, declared: &[Profile]) -> Vec<Profile> {
        self.push_declared(declared)
    }

    fn push_declared(&mut self, declared: &[Profile]) -> Vec<Profile> {
        let mut seen = HashSet::new();
        let unique: Vec<&Profile> = declared.iter().filter(|p| seen.insert(p.name())).collect();
        let mut pushed = Vec::new();
        for profile in unique.into_iter().rev() {
            let token = ProfileToken::named(profile.name());
            if self.is_processed(&token) {
                tracing::trace!(profile = %profile, "Declared profile already processed");
                continue;
            }
            self.pending.push(token);
            pushed.push(Profile::new(profile.name()));
        }
        pushed
    }
}

/// Profiles a property source declares through the reserved keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDeclarations {
    /// Profiles listed under `config.profiles.active`
    pub active: Vec<Profile>,
    /// Profiles listed under `config.profiles.include`
    pub include: Vec<Profile>,
}

impl ProfileDeclarations {
    /// Read declarations from one source, resolving placeholders against `env`.
    pub fn from_source(source: &dyn PropertySource, env: &Environment) -> Self {
        Self {
            active: read_profile_list(|k| source.get_property(k), ACTIVE_PROFILES_PROPERTY, env),
            include: read_profile_list(|k| source.get_property(k), INCLUDE_PROFILES_PROPERTY, env),
        }
    }

    /// Read declarations already visible in the environment.
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            active: read_profile_list(|k| env.get_property(k), ACTIVE_PROFILES_PROPERTY, env),
            include: read_profile_list(|k| env.get_property(k), INCLUDE_PROFILES_PROPERTY, env),
        }
    }

    /// Whether nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.include.is_empty()
    }

    /// Active then included profiles, without duplicates.
    pub fn all(&self) -> Vec<Profile> {
        let mut seen = HashSet::new();
        self.active
            .iter()
            .chain(&self.include)
            .filter(|p| seen.insert(p.name().to_string()))
            .cloned()
            .collect()
    }
}

fn read_profile_list<F>(lookup: F, key: &str, env: &Environment) -> Vec<Profile>
where
    F: Fn(&str) -> Option<String>,
{
    collect_list(lookup, key, env)
        .into_iter()
        .map(Profile::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MapSource;

    fn names(tokens: &[ProfileToken]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_profile_equality_by_name() {
        assert_eq!(Profile::new("db"), Profile::fallback("db"));
        assert_ne!(Profile::new("db"), Profile::new("dev"));
    }

    #[test]
    fn test_bucket_keys() {
        assert_eq!(ProfileToken::Base.bucket_key(), "profile=");
        assert_eq!(ProfileToken::named("db").bucket_key(), "profile=db");
    }

    #[test]
    fn test_seed_with_explicit_profiles() {
        let worklist = ProfileWorklist::seed(
            &[Profile::new("development"), Profile::new("db")],
            &[Profile::fallback("default")],
            16,
        );
        // Top of the stack is the end of the slice.
        assert_eq!(names(worklist.pending()), vec!["db", "development", "(base)"]);
    }

    #[test]
    fn test_seed_with_defaults() {
        let mut worklist = ProfileWorklist::seed(&[], &[Profile::fallback("default")], 16);
        assert_eq!(worklist.pop().unwrap(), Some(ProfileToken::Base));

        let next = worklist.pop().unwrap().unwrap();
        assert_eq!(next.profile_name(), Some("default"));
        assert!(next.is_default());
    }

    #[test]
    fn test_first_activation_wins_and_purges_defaults() {
        let mut worklist = ProfileWorklist::seed(&[], &[Profile::fallback("default")], 16);
        let base = worklist.pop().unwrap().unwrap();

        let outcome = worklist.activate(&[Profile::new("dev")]);
        assert_eq!(outcome, Activation::Applied(vec![Profile::new("dev")]));
        assert!(worklist.is_activated());
        assert_eq!(names(worklist.pending()), vec!["dev"]);

        let outcome = worklist.activate(&[Profile::new("prod")]);
        assert_eq!(outcome, Activation::Ignored(vec![Profile::new("prod")]));
        assert_eq!(names(worklist.pending()), vec!["dev"]);

        worklist.mark_processed(base);
        assert_eq!(worklist.pop().unwrap(), Some(ProfileToken::named("dev")));
        assert_eq!(worklist.pop().unwrap(), None);
    }

    #[test]
    fn test_empty_activation_does_not_count() {
        let mut worklist = ProfileWorklist::new(4);
        assert_eq!(worklist.activate(&[]), Activation::Applied(Vec::new()));
        assert!(!worklist.is_activated());
    }

    #[test]
    fn test_declared_order_last_wins() {
        let mut worklist = ProfileWorklist::new(16);
        let pushed = worklist.include(&[Profile::new("x"), Profile::new("y"), Profile::new("x")]);

        assert_eq!(pushed, vec![Profile::new("y"), Profile::new("x")]);
        // x is processed first, so y's bucket is created later and ranks higher.
        assert_eq!(worklist.pop().unwrap(), Some(ProfileToken::named("x")));
        assert_eq!(worklist.pop().unwrap(), Some(ProfileToken::named("y")));
    }

    #[test]
    fn test_includes_do_not_purge_defaults() {
        let mut worklist = ProfileWorklist::seed(&[], &[Profile::fallback("default")], 16);
        worklist.pop().unwrap();
        worklist.include(&[Profile::new("x")]);

        assert_eq!(names(worklist.pending()), vec!["default", "x"]);
        assert!(!worklist.is_activated());
    }

    #[test]
    fn test_processed_profiles_are_not_repeated() {
        let mut worklist = ProfileWorklist::seed(&[Profile::new("a")], &[], 16);
        let base = worklist.pop().unwrap().unwrap();
        worklist.mark_processed(base);
        let a = worklist.pop().unwrap().unwrap();
        worklist.mark_processed(a);

        assert!(worklist.include(&[Profile::new("a")]).is_empty());
        assert_eq!(worklist.pop().unwrap(), None);
        assert_eq!(worklist.processed_profiles(), vec![Profile::new("a")]);
        assert_eq!(worklist.processed().len(), 2);
    }

    #[test]
    fn test_duplicate_pending_tokens_are_skipped() {
        let mut worklist = ProfileWorklist::new(16);
        worklist.include(&[Profile::new("a")]);
        worklist.include(&[Profile::new("a")]);

        let a = worklist.pop().unwrap().unwrap();
        worklist.mark_processed(a);
        assert_eq!(worklist.pop().unwrap(), None);
    }

    #[test]
    fn test_iteration_limit() {
        let mut worklist = ProfileWorklist::seed(&[Profile::new("a"), Profile::new("b")], &[], 2);
        assert!(worklist.pop().is_ok());
        assert!(worklist.pop().is_ok());
        assert!(matches!(
            worklist.pop(),
            Err(ConfigError::ProfileLimitExceeded { limit: 2 })
        ));
    }

    #[test]
    fn test_declarations_from_comma_list() {
        let env = Environment::new();
        let source = MapSource::new("file")
            .with_property(ACTIVE_PROFILES_PROPERTY, "dev, db,,dev")
            .with_property(INCLUDE_PROFILES_PROPERTY, "x");

        let declarations = ProfileDeclarations::from_source(&source, &env);
        assert_eq!(declarations.active, vec![Profile::new("dev"), Profile::new("db")]);
        assert_eq!(declarations.include, vec![Profile::new("x")]);
        assert_eq!(declarations.all().len(), 3);
    }

    #[test]
    fn test_declarations_from_indexed_list() {
        let env = Environment::new();
        let source = MapSource::new("file")
            .with_property("config.profiles.include[0]", "x")
            .with_property("config.profiles.include[1]", "y");

        let declarations = ProfileDeclarations::from_source(&source, &env);
        assert!(declarations.active.is_empty());
        assert_eq!(declarations.include, vec![Profile::new("x"), Profile::new("y")]);
    }

    #[test]
    fn test_declarations_resolve_placeholders() {
        let mut env = Environment::new();
        env.add_last(MapSource::new("props").with_property("region", "eu,cloud"));
        let source = MapSource::new("file").with_property(ACTIVE_PROFILES_PROPERTY, "${region}");

        let declarations = ProfileDeclarations::from_source(&source, &env);
        assert_eq!(declarations.active, vec![Profile::new("eu"), Profile::new("cloud")]);
    }
}
