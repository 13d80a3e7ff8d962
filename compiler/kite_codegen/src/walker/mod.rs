//! Depth-first closure discovery.
//!
//! [`ClosureWalker`] walks a body's syntax, enters a closure context for
//! every function literal it meets, and resolves local-variable uses so
//! each closure learns what it captures. Call children are walked in source
//! order: callee, value arguments, the trailing literals found by
//! [`resolve_arguments`], and any other expression child of the call.
//!
//! The walker emits nothing itself. A [`ClosureVisitor`] sees each closure
//! context while it is live; the walker returns an [`EmittedClosure`]
//! summary for every closure once its body is done.

use kite_ir::{DescriptorId, DescriptorKind, Name};
use kite_syntax::{resolve_arguments, CallExpr, LabeledExpr, NodeId, SyntaxKind, SyntaxTree};
use tracing::{debug, trace};

use crate::{
    ClassIdentity, ClosureKind, CodegenBinding, CodegenError, ContextId, ContextTree,
    InternalError,
};

/// Callback invoked when the walker enters a closure context.
pub trait ClosureVisitor {
    fn enter_closure(
        &mut self,
        contexts: &ContextTree,
        closure: ContextId,
    ) -> Result<(), CodegenError>;
}

impl<F> ClosureVisitor for F
where
    F: FnMut(&ContextTree, ContextId) -> Result<(), CodegenError>,
{
    fn enter_closure(
        &mut self,
        contexts: &ContextTree,
        closure: ContextId,
    ) -> Result<(), CodegenError> {
        self(contexts, closure)
    }
}

/// Summary of one closure, produced after its body was walked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedClosure {
    /// The function literal node.
    pub node: NodeId,
    pub function_descriptor: DescriptorId,
    pub kind: ClosureKind,
    pub class: ClassIdentity,
    /// Declared result type governing the closure's return points.
    pub return_type: Option<Name>,
    /// Class of the enclosing closure, if the literal is nested in one.
    pub parent_class: Option<ClassIdentity>,
    /// Captured locals in first-capture order.
    pub captures: Vec<DescriptorId>,
}

/// Walks syntax below a live context, building closure contexts.
pub struct ClosureWalker<'a, 'd> {
    syntax: &'a SyntaxTree,
    binding: &'a CodegenBinding<'d>,
    contexts: &'a mut ContextTree,
    emitted: Vec<EmittedClosure>,
}

impl<'a, 'd> ClosureWalker<'a, 'd> {
    pub fn new(
        syntax: &'a SyntaxTree,
        binding: &'a CodegenBinding<'d>,
        contexts: &'a mut ContextTree,
    ) -> Self {
        Self {
            syntax,
            binding,
            contexts,
            emitted: Vec::new(),
        }
    }

    /// Walk `node` inside `context`.
    ///
    /// Closures are returned in completion order: inner closures before the
    /// closures enclosing them. On error the tree may still hold contexts
    /// entered by this walk.
    pub fn walk(
        mut self,
        node: NodeId,
        context: ContextId,
        visitor: &mut dyn ClosureVisitor,
    ) -> Result<Vec<EmittedClosure>, CodegenError> {
        self.walk_node(node, context, visitor)?;
        debug!(closures = self.emitted.len(), "closure walk complete");
        Ok(self.emitted)
    }

    fn walk_node(
        &mut self,
        node: NodeId,
        context: ContextId,
        visitor: &mut dyn ClosureVisitor,
    ) -> Result<(), CodegenError> {
        match self.syntax.kind(node) {
            SyntaxKind::CallExpr => self.walk_call(node, context, visitor),
            SyntaxKind::FunctionLiteral => self.walk_literal(node, context, visitor),
            SyntaxKind::NameRef => self.resolve_name(node, context),
            SyntaxKind::Parameter => self.declare(node, context),
            SyntaxKind::VariableDecl => {
                // Initializer first: `val x = x` reads the outer `x`.
                self.walk_children(node, context, visitor)?;
                self.declare(node, context)
            }
            _ => self.walk_children(node, context, visitor),
        }
    }

    fn walk_children(
        &mut self,
        node: NodeId,
        context: ContextId,
        visitor: &mut dyn ClosureVisitor,
    ) -> Result<(), CodegenError> {
        let syntax = self.syntax;
        for &child in syntax.children(node) {
            self.walk_node(child, context, visitor)?;
        }
        Ok(())
    }

    fn walk_call(
        &mut self,
        node: NodeId,
        context: ContextId,
        visitor: &mut dyn ClosureVisitor,
    ) -> Result<(), CodegenError> {
        let Some(call) = CallExpr::cast(self.syntax, node) else {
            return self.walk_children(node, context, visitor);
        };
        let arguments = resolve_arguments(call);
        trace!(
            ?node,
            values = arguments.value_arguments.len(),
            literals = arguments.function_literals.len(),
            "walking call"
        );

        let callee = call.callee();
        let value_list = call.value_argument_list();
        let syntax = self.syntax;
        for &child in syntax.children(node) {
            if Some(child) == callee {
                self.walk_node(child, context, visitor)?;
            } else if Some(child) == value_list {
                for argument in &arguments.value_arguments {
                    if let Some(expression) = argument.expression {
                        self.walk_node(expression, context, visitor)?;
                    }
                }
            } else if let Some(literal) = self.reported_literal(child, &arguments.function_literals)
            {
                self.walk_literal(literal, context, visitor)?;
            } else if syntax.kind(child).is_expression() {
                // Evaluated, but not an argument: `{ a } (b)`, `f() label@x`.
                self.walk_node(child, context, visitor)?;
            }
        }
        Ok(())
    }

    /// The literal `child` contributes to the call's literal arguments.
    fn reported_literal(&self, child: NodeId, literals: &[NodeId]) -> Option<NodeId> {
        if literals.contains(&child) {
            return Some(child);
        }
        LabeledExpr::cast(self.syntax, child)
            .and_then(LabeledExpr::labeled_expression)
            .filter(|inner| literals.contains(inner))
    }

    fn walk_literal(
        &mut self,
        node: NodeId,
        parent: ContextId,
        visitor: &mut dyn ClosureVisitor,
    ) -> Result<(), CodegenError> {
        let function_descriptor = self
            .binding
            .descriptor_for(node)
            .ok_or(InternalError::UnboundLiteral { node })?;
        let lookup = self.contexts.get(parent)?.local_lookup();

        let closure = match self.binding.coroutine_original(function_descriptor) {
            Some(original) => self.contexts.new_coroutine_closure_context(
                self.binding,
                function_descriptor,
                original,
                Some(parent),
                lookup,
            )?,
            None => self.contexts.new_closure_context(
                self.binding,
                function_descriptor,
                Some(parent),
                lookup,
            )?,
        };

        visitor.enter_closure(self.contexts, closure)?;
        self.walk_children(node, closure, visitor)?;

        let ctx = self.contexts.get(closure)?;
        let Some(&closure_data) = ctx.as_closure() else {
            return Err(InternalError::UnknownContext { context: closure }.into());
        };
        let captures = self.contexts.local_lookup(lookup)?.captures(closure).to_vec();
        let parent_class = self
            .contexts
            .get(parent)?
            .as_closure()
            .map(|c| c.class_identity());

        self.contexts.pop(closure)?;
        self.emitted.push(EmittedClosure {
            node,
            function_descriptor,
            kind: closure_data.kind(),
            class: closure_data.class_identity(),
            return_type: closure_data.return_type(self.binding.descriptors()),
            parent_class,
            captures,
        });
        Ok(())
    }

    fn declare(&mut self, node: NodeId, context: ContextId) -> Result<(), CodegenError> {
        if let Some(variable) = self.local_variable(node) {
            self.contexts.declare_local(context, variable)?;
        }
        Ok(())
    }

    fn resolve_name(&mut self, node: NodeId, context: ContextId) -> Result<(), CodegenError> {
        if let Some(variable) = self.local_variable(node) {
            self.contexts.resolve_local(context, variable)?;
        }
        Ok(())
    }

    fn local_variable(&self, node: NodeId) -> Option<DescriptorId> {
        self.binding.descriptor_for(node).filter(|&d| {
            self.binding.descriptors().kind(d) == Some(DescriptorKind::Variable)
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
