//! Name → back-end resolution.
//!
//! The textual configuration layer that names devices lives outside
//! this crate; what ships here is the in-process half of the contract:
//! a registry mapping a back-end *type* to an open function, plus plain
//! aliases. An unknown name resolves to nothing (`NotFound`); an alias
//! whose type has no registered opener is a dangling definition
//! (`NoBackend`).

use ostinato_core::{Error, Mode, Pcm, Result, Stream};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// What an open function receives.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    /// The name the application asked for.
    pub name: String,
    /// The resolved back-end type.
    pub type_name: String,
    pub stream: Stream,
    pub mode: Mode,
}

pub type OpenFn = Arc<dyn Fn(&OpenRequest) -> Result<Pcm> + Send + Sync>;

/// Registry of back-end open functions and name aliases.
pub struct Registry {
    openers: Mutex<HashMap<String, OpenFn>>,
    aliases: Mutex<HashMap<String, String>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry {
            openers: Mutex::new(HashMap::new()),
            aliases: Mutex::new(HashMap::new()),
        }
    }

    /// A registry with the built-in back-ends registered.
    pub fn with_defaults() -> Registry {
        let registry = Registry::new();
        registry.register("null", |req: &OpenRequest| {
            ostinato_plug::null::open(req.name.clone(), req.stream, req.mode)
        });
        registry.register("loop", |req: &OpenRequest| {
            ostinato_plug::loopback::open(req.name.clone(), req.stream, req.mode)
                .map(|(pcm, _clock)| pcm)
        });
        registry
    }

    /// Register an open function for a back-end type.
    pub fn register(
        &self,
        type_name: impl Into<String>,
        open: impl Fn(&OpenRequest) -> Result<Pcm> + Send + Sync + 'static,
    ) {
        let type_name = type_name.into();
        tracing::info!(type_name = %type_name, "registered PCM back-end");
        self.openers.lock().insert(type_name, Arc::new(open));
    }

    /// Define `name` as an alias for a back-end type.
    pub fn define(&self, name: impl Into<String>, type_name: impl Into<String>) {
        self.aliases.lock().insert(name.into(), type_name.into());
    }

    /// Resolve `name` and open a handle.
    pub fn open(&self, name: &str, stream: Stream, mode: Mode) -> Result<Pcm> {
        let type_name = match self.aliases.lock().get(name) {
            Some(ty) => ty.clone(),
            None if self.openers.lock().contains_key(name) => name.to_string(),
            None => return Err(Error::NotFound(name.to_string())),
        };
        let open = self
            .openers
            .lock()
            .get(&type_name)
            .cloned()
            .ok_or_else(|| Error::NoBackend(type_name.clone()))?;
        let request = OpenRequest {
            name: name.to_string(),
            type_name,
            stream,
            mode,
        };
        tracing::debug!(name = %request.name, type_name = %request.type_name, "opening PCM");
        open(&request)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::with_defaults()
    }
}

/// The process-wide registry with the built-in back-ends.
pub fn default_registry() -> &'static Registry {
    static DEFAULT: OnceLock<Registry> = OnceLock::new();
    DEFAULT.get_or_init(Registry::with_defaults)
}
