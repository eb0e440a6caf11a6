use lru::LruCache;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

const MAX_ENTRY_LEN: usize = 100;
const DEFAULT_RESOLVER_CACHE: usize = 512;

/// Looks up character and guild ids by name.
pub trait NameResolver {
    fn player_id(&mut self, name: &str) -> Option<u32>;
    fn guild_id(&mut self, name: &str) -> Option<u32>;
}

/// Fixed name table, used by the static map loader and tests.
#[derive(Debug, Default, Clone)]
pub struct TableNameResolver {
    players: HashMap<String, u32>,
    guilds: HashMap<String, u32>,
}

impl TableNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_player(mut self, name: &str, id: u32) -> Self {
        self.players.insert(name.to_lowercase(), id);
        self
    }

    pub fn with_guild(mut self, name: &str, id: u32) -> Self {
        self.guilds.insert(name.to_lowercase(), id);
        self
    }
}

impl NameResolver for TableNameResolver {
    fn player_id(&mut self, name: &str) -> Option<u32> {
        self.players.get(&name.to_lowercase()).copied()
    }

    fn guild_id(&mut self, name: &str) -> Option<u32> {
        self.guilds.get(&name.to_lowercase()).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolverStats {
    pub hits: u64,
    pub misses: u64,
}

/// LRU front for a slower resolver. Negative answers are cached too, so a
/// list full of deleted characters does not hit the backend on every load.
pub struct CachedNameResolver<R> {
    inner: R,
    players: LruCache<String, Option<u32>>,
    guilds: LruCache<String, Option<u32>>,
    stats: ResolverStats,
}

impl<R: NameResolver> CachedNameResolver<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_RESOLVER_CACHE)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            players: LruCache::new(capacity),
            guilds: LruCache::new(capacity),
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }
}

impl<R: NameResolver> NameResolver for CachedNameResolver<R> {
    fn player_id(&mut self, name: &str) -> Option<u32> {
        let key = name.to_lowercase();
        if let Some(cached) = self.players.get(&key) {
            self.stats.hits += 1;
            return *cached;
        }
        self.stats.misses += 1;
        let resolved = self.inner.player_id(name);
        self.players.put(key, resolved);
        resolved
    }

    fn guild_id(&mut self, name: &str) -> Option<u32> {
        let key = name.to_lowercase();
        if let Some(cached) = self.guilds.get(&key) {
            self.stats.hits += 1;
            return *cached;
        }
        self.stats.misses += 1;
        let resolved = self.inner.guild_id(name);
        self.guilds.put(key, resolved);
        resolved
    }
}

/// The character an access check is made for.
#[derive(Debug, Clone, Copy)]
pub struct AccessSubject<'a> {
    pub name: &'a str,
    pub player_id: u32,
    pub guild_id: Option<u32>,
}

/// House or door access list, kept both as the text the owner typed and as
/// the resolved id sets and wildcard patterns.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    text: String,
    players: HashSet<u32>,
    guilds: HashSet<u32>,
    expressions: Vec<String>,
    // Rejections sit in front of grants; the first match decides.
    patterns: Vec<(Regex, bool)>,
}

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str, resolver: &mut dyn NameResolver) -> Self {
        let mut list = Self::new();
        list.parse_list(text, resolver);
        list
    }

    /// Replaces the list with `text`. Entries are separated by newlines or
    /// commas; `#` starts a comment line, `@name` names a guild and entries
    /// containing `!`, `*` or `?` are patterns. Unresolvable names are kept
    /// in the text but grant nothing.
    pub fn parse_list(&mut self, text: &str, resolver: &mut dyn NameResolver) {
        *self = Self::default();
        self.text = text.to_string();

        for entry in text.split(|ch| ch == '\n' || ch == ',') {
            let entry = entry.trim();
            if entry.is_empty() || entry.starts_with('#') || entry.len() > MAX_ENTRY_LEN {
                continue;
            }
            if let Some(guild) = entry.strip_prefix('@') {
                self.add_guild(guild.trim(), resolver);
            } else if entry.contains(['!', '*', '?']) {
                self.add_expression(entry);
            } else {
                self.add_player(entry, resolver);
            }
        }
    }

    pub fn add_player(&mut self, name: &str, resolver: &mut dyn NameResolver) -> bool {
        match resolver.player_id(name) {
            Some(id) => self.players.insert(id),
            None => false,
        }
    }

    pub fn add_guild(&mut self, name: &str, resolver: &mut dyn NameResolver) -> bool {
        match resolver.guild_id(name) {
            Some(id) => self.guilds.insert(id),
            None => false,
        }
    }

    /// Adds a wildcard pattern. `*` matches any run of characters, `?` at
    /// most one; a leading `!` turns the pattern into a rejection.
    pub fn add_expression(&mut self, expression: &str) -> bool {
        let expression = expression.to_lowercase();
        if self.expressions.contains(&expression) {
            return false;
        }
        let (body, allow) = match expression.strip_prefix('!') {
            Some(rest) => (rest, false),
            None => (expression.as_str(), true),
        };
        if body.is_empty() {
            return false;
        }
        let Some(pattern) = compile_wildcard(body) else {
            return false;
        };
        if allow {
            self.patterns.push((pattern, true));
        } else {
            self.patterns.insert(0, (pattern, false));
        }
        self.expressions.push(expression);
        true
    }

    pub fn is_in_list(&self, subject: &AccessSubject<'_>) -> bool {
        let name = subject.name.to_lowercase();
        for (pattern, allow) in &self.patterns {
            if pattern.is_match(&name) {
                return *allow;
            }
        }
        if self.players.contains(&subject.player_id) {
            return true;
        }
        subject
            .guild_id
            .map_or(false, |guild| self.guilds.contains(&guild))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }
}

fn compile_wildcard(body: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    for ch in body.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push_str(".?"),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}
