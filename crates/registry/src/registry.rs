use std::collections::HashMap;
use std::sync::Arc;

use iceos_error::IceError;
use iceos_workflow::Blueprint;

use crate::agent::AgentFactory;
use crate::executor::NodeExecutor;
use crate::llm::LlmProvider;
use crate::tool::Tool;

/// Maps `NodeType -> Executor` plus name-indexed factories for tools,
/// agents, and LLM providers, and a table of registered named workflows.
/// Registration is idempotent for identical `Arc` pointers; conflicting
/// distinct registrations under the same name fail with `RegistryError`.
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
    tools: HashMap<String, Arc<dyn Tool>>,
    agents: HashMap<String, Arc<dyn AgentFactory>>,
    llms: HashMap<String, Arc<dyn LlmProvider>>,
    workflows: HashMap<String, Blueprint>,
    allow_dynamic_registration: bool,
}

impl ExecutorRegistry {
    /// `allow_dynamic_registration` gates any `register_*` call made after
    /// startup; it should be `false` in production per the external
    /// interfaces' `allow_dynamic_registration` config knob.
    #[must_use]
    pub fn new(allow_dynamic_registration: bool) -> Self {
        Self {
            executors: HashMap::new(),
            tools: HashMap::new(),
            agents: HashMap::new(),
            llms: HashMap::new(),
            workflows: HashMap::new(),
            allow_dynamic_registration,
        }
    }

    /// Marks startup complete; subsequent `register_*` calls are rejected
    /// unless the registry was constructed with dynamic registration
    /// allowed.
    pub fn finish_startup(&mut self) {
        self.allow_dynamic_registration = false;
    }

    fn guard_dynamic(&self) -> Result<(), IceError> {
        if self.allow_dynamic_registration {
            Ok(())
        } else {
            Err(IceError::registry("dynamic registration is disabled"))
        }
    }

    pub fn register_executor(&mut self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) -> Result<(), IceError> {
        let node_type = node_type.into();
        if let Some(existing) = self.executors.get(&node_type) {
            if !Arc::ptr_eq(existing, &executor) {
                self.guard_dynamic()?;
            }
        }
        self.executors.insert(node_type, executor);
        Ok(())
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) -> Result<(), IceError> {
        let name = tool.name().to_owned();
        if let Some(existing) = self.tools.get(&name) {
            if !Arc::ptr_eq(existing, &tool) {
                self.guard_dynamic()?;
            }
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn register_agent_factory(&mut self, factory: Arc<dyn AgentFactory>) -> Result<(), IceError> {
        let name = factory.package().to_owned();
        if let Some(existing) = self.agents.get(&name) {
            if !Arc::ptr_eq(existing, &factory) {
                self.guard_dynamic()?;
            }
        }
        self.agents.insert(name, factory);
        Ok(())
    }

    pub fn register_llm(&mut self, provider: Arc<dyn LlmProvider>) -> Result<(), IceError> {
        let name = provider.model().to_owned();
        if let Some(existing) = self.llms.get(&name) {
            if !Arc::ptr_eq(existing, &provider) {
                self.guard_dynamic()?;
            }
        }
        self.llms.insert(name, provider);
        Ok(())
    }

    pub fn register_workflow(&mut self, name: impl Into<String>, blueprint: Blueprint) -> Result<(), IceError> {
        let name = name.into();
        if self.workflows.contains_key(&name) {
            self.guard_dynamic()?;
        }
        self.workflows.insert(name, blueprint);
        Ok(())
    }

    #[must_use]
    pub fn get_executor(&self, node_type: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.executors.get(node_type).cloned()
    }

    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    #[must_use]
    pub fn get_agent(&self, package: &str) -> Option<Arc<dyn AgentFactory>> {
        self.agents.get(package).cloned()
    }

    #[must_use]
    pub fn get_llm(&self, model: &str) -> Option<Arc<dyn LlmProvider>> {
        self.llms.get(model).cloned()
    }

    #[must_use]
    pub fn get_workflow(&self, name: &str) -> Option<Blueprint> {
        self.workflows.get(name).cloned()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn call(&self, args: Value) -> Result<Value, IceError> {
            Ok(args)
        }
    }

    #[test]
    fn registers_and_looks_up_a_tool() {
        let mut registry = ExecutorRegistry::new(true);
        registry.register_tool(Arc::new(Echo)).unwrap();
        assert!(registry.get_tool("echo").is_some());
        assert!(registry.get_tool("missing").is_none());
    }

    #[test]
    fn registering_same_tool_pointer_twice_is_idempotent() {
        let mut registry = ExecutorRegistry::new(false);
        let tool: Arc<dyn Tool> = Arc::new(Echo);
        registry.register_tool(tool.clone()).unwrap();
        assert!(registry.register_tool(tool).is_ok());
    }

    #[test]
    fn finish_startup_disables_further_registration_of_workflows() {
        use iceos_workflow::Blueprint;
        use semver::Version;

        let mut registry = ExecutorRegistry::new(true);
        registry.register_workflow("wf1", Blueprint::new("bp1", Version::new(1, 0, 0), vec![])).unwrap();
        registry.finish_startup();
        let result = registry.register_workflow("wf1", Blueprint::new("bp1", Version::new(1, 0, 1), vec![]));
        assert!(result.is_err());
    }

    #[test]
    fn workflow_lookup_round_trips() {
        use iceos_workflow::Blueprint;
        use semver::Version;

        let mut registry = ExecutorRegistry::new(true);
        registry.register_workflow("greeter", Blueprint::new("bp1", Version::new(1, 0, 0), vec![])).unwrap();
        assert!(registry.get_workflow("greeter").is_some());
        assert!(registry.get_workflow("missing").is_none());
    }
}
