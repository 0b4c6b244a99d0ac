use crate::{
    model::{NodeKind, NodeModel, NodeModels, BUILTIN_CATEGORY},
    port::PortModel,
};

/// The vocabulary of node types known to one editing session.
///
/// `Registry::default()` knows the standard control, decorator and action
/// nodes plus the synthetic `Root`. Custom types are added while loading a
/// file; the first registration of an id wins.
#[derive(Debug, Clone)]
pub struct Registry {
    models: NodeModels,
}

impl Default for Registry {
    fn default() -> Self {
        let mut ret = Self::empty();
        ret.register_builtin(builtin_models());
        ret
    }
}

impl Registry {
    /// A registry that knows nothing, not even `Root`.
    pub fn empty() -> Self {
        Self {
            models: NodeModels::new(),
        }
    }

    /// Tags every model as builtin and registers it, then injects `Root`.
    pub fn register_builtin(&mut self, models: impl IntoIterator<Item = NodeModel>) {
        for model in models {
            self.register(model.with_category(BUILTIN_CATEGORY));
        }
        self.register(NodeModel::root());
    }

    /// Returns `false` and keeps the existing entry when the id is taken.
    pub fn register(&mut self, model: NodeModel) -> bool {
        if self.models.contains_key(&model.registration_id) {
            return false;
        }
        self.models.insert(model.registration_id.clone(), model);
        true
    }

    pub fn merge(&mut self, models: impl IntoIterator<Item = NodeModel>) {
        for model in models {
            self.register(model);
        }
    }

    pub fn get(&self, id: &str) -> Option<&NodeModel> {
        self.models.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    pub fn is_builtin(&self, id: &str) -> bool {
        self.models.get(id).map_or(false, NodeModel::is_builtin)
    }

    pub fn models(&self) -> &NodeModels {
        &self.models
    }

    pub fn custom_models(&self) -> impl Iterator<Item = &NodeModel> {
        self.models.values().filter(|model| !model.is_builtin())
    }

    /// Builtin models cannot be removed.
    pub fn remove(&mut self, id: &str) -> Option<NodeModel> {
        if self.is_builtin(id) {
            return None;
        }
        self.models.remove(id)
    }
}

fn control(id: &str) -> NodeModel {
    NodeModel::new(NodeKind::Control, id)
}

fn decorator(id: &str) -> NodeModel {
    NodeModel::new(NodeKind::Decorator, id)
}

fn action(id: &str) -> NodeModel {
    NodeModel::new(NodeKind::Action, id)
}

fn switch(cases: usize) -> NodeModel {
    let mut ret = control(&format!("Switch{}", cases)).with_port(
        "variable",
        PortModel::new_in("std::string").with_description("blackboard entry to compare"),
    );
    for case in 1..=cases {
        ret = ret.with_port(format!("case_{}", case), PortModel::new_in("std::string"));
    }
    ret
}

fn blackboard_check(id: &str, ty: &str) -> NodeModel {
    decorator(id)
        .with_port("value_A", PortModel::new_in(ty))
        .with_port("value_B", PortModel::new_in(ty))
        .with_port("return_on_mismatch", PortModel::new_in("NodeStatus"))
}

/// Node types every tree file may use without declaring them.
pub fn builtin_models() -> Vec<NodeModel> {
    vec![
        control("Sequence"),
        control("SequenceStar"),
        control("Fallback"),
        control("ReactiveSequence"),
        control("ReactiveFallback"),
        control("Parallel")
            .with_port("success_threshold", PortModel::new_in("int"))
            .with_port("failure_threshold", PortModel::new_in("int")),
        control("IfThenElse"),
        control("WhileDoElse"),
        switch(2),
        switch(3),
        decorator("Inverter"),
        decorator("ForceSuccess"),
        decorator("ForceFailure"),
        decorator("KeepRunningUntilFailure"),
        decorator("Repeat").with_port(
            "num_cycles",
            PortModel::new_in("int").with_description("Repeat a successful child up to N times"),
        ),
        decorator("RetryUntilSuccessful").with_port(
            "num_attempts",
            PortModel::new_in("int").with_description("Execute again a failing child up to N times"),
        ),
        decorator("Timeout").with_port("msec", PortModel::new_in("unsigned int")),
        decorator("Delay").with_port("delay_msec", PortModel::new_in("unsigned int")),
        blackboard_check("BlackboardCheckInt", "int"),
        blackboard_check("BlackboardCheckDouble", "double"),
        blackboard_check("BlackboardCheckString", "std::string"),
        action("AlwaysSuccess"),
        action("AlwaysFailure"),
        action("SetBlackboard")
            .with_port("value", PortModel::new_in("std::string"))
            .with_port("output_key", PortModel::new_inout("std::string")),
    ]
}
