use crate::agent::AgentConfig;
use crate::error::ConfigError;

/// Agent configurations known to the process, keyed by unique name.
///
/// Iteration follows registration order.
#[derive(Clone, Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentConfig>,
}

impl AgentRegistry {
    /// Adds `config`, rejecting a name that is already taken.
    pub fn register(&mut self, config: AgentConfig) -> Result<(), ConfigError> {
        if self.get(config.name()).is_some() {
            return Err(ConfigError::DuplicateName(config.name().to_owned()));
        }
        debug!(agent = config.name(), "agent registered");
        self.agents.push(config);
        Ok(())
    }

    /// Looks an agent up by name.
    pub fn get(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|config| config.name() == name)
    }

    /// Returns the registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(AgentConfig::name)
    }

    /// Iterates over the registered configurations.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, AgentConfig> {
        self.agents.iter()
    }

    /// Returns the number of registered agents.
    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns `true` if no agent is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl<'a> IntoIterator for &'a AgentRegistry {
    type Item = &'a AgentConfig;
    type IntoIter = std::slice::Iter<'a, AgentConfig>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentBuilder;

    fn config(name: &str, instructions: &str) -> AgentConfig {
        AgentBuilder::new(name, instructions).config().unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = AgentRegistry::default();
        assert!(registry.is_empty());
        registry.register(config("alfred", "Help.")).unwrap();
        registry.register(config("butler", "Serve.")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["alfred", "butler"]);
        assert_eq!(registry.get("butler").unwrap().instruction(), "Serve.");
        assert!(registry.get("nobody").is_none());
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = AgentRegistry::default();
        registry.register(config("alfred", "first")).unwrap();
        let err = registry.register(config("alfred", "second")).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateName("alfred".to_owned()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("alfred").unwrap().instruction(), "first");
    }
}
