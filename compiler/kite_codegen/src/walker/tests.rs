use kite_ir::{DescriptorTable, SharedInterner};
use kite_syntax::SyntaxTreeBuilder;
use pretty_assertions::assert_eq;

use super::*;
use crate::{CodegenOptions, OwnerKind};

fn no_visit(_: &ContextTree, _: ContextId) -> Result<(), CodegenError> {
    Ok(())
}

struct Body {
    syntax: SyntaxTree,
    root: NodeId,
    outer_literal: NodeId,
    inner_literal: NodeId,
    x_decl: NodeId,
    x_uses: Vec<NodeId>,
    it_param: NodeId,
    it_use: NodeId,
}

/// ```text
/// val x = 1
/// run(x) { it -> x; apply { it; x } }
/// ```
fn body(interner: &SharedInterner) -> Body {
    let mut b = SyntaxTreeBuilder::new(interner.clone());
    let mut x_uses = Vec::new();
    b.start_node(SyntaxKind::SourceFile);

    b.start_node(SyntaxKind::VariableDecl);
    b.leaf(SyntaxKind::Ident, "x");
    b.space();
    b.token(SyntaxKind::Eq);
    b.space();
    b.leaf(SyntaxKind::IntLiteral, "1");
    let x_decl = b.finish_node();

    b.start_node(SyntaxKind::CallExpr);
    b.leaf(SyntaxKind::NameRef, "run");
    b.start_node(SyntaxKind::ValueArgumentList);
    b.token(SyntaxKind::LParen);
    b.start_node(SyntaxKind::ValueArgument);
    x_uses.push(b.leaf(SyntaxKind::NameRef, "x"));
    b.finish_node();
    b.token(SyntaxKind::RParen);
    b.finish_node();
    b.space();

    b.start_node(SyntaxKind::FunctionLiteral);
    b.token(SyntaxKind::LBrace);
    b.start_node(SyntaxKind::Parameter);
    b.leaf(SyntaxKind::Ident, "it");
    let it_param = b.finish_node();
    b.token(SyntaxKind::Arrow);
    x_uses.push(b.leaf(SyntaxKind::NameRef, "x"));

    b.start_node(SyntaxKind::CallExpr);
    b.leaf(SyntaxKind::NameRef, "apply");
    b.space();
    b.start_node(SyntaxKind::FunctionLiteral);
    b.token(SyntaxKind::LBrace);
    let it_use = b.leaf(SyntaxKind::NameRef, "it");
    x_uses.push(b.leaf(SyntaxKind::NameRef, "x"));
    b.token(SyntaxKind::RBrace);
    let inner_literal = b.finish_node();
    b.finish_node();

    b.token(SyntaxKind::RBrace);
    let outer_literal = b.finish_node();
    b.finish_node();

    let root = b.finish_node();
    Body {
        syntax: b.finish(),
        root,
        outer_literal,
        inner_literal,
        x_decl,
        x_uses,
        it_param,
        it_use,
    }
}

struct Declarations {
    table: DescriptorTable,
    main: DescriptorId,
    x: DescriptorId,
    it: DescriptorId,
    outer: DescriptorId,
    inner: DescriptorId,
}

fn declarations(interner: &SharedInterner, suspend_outer: bool) -> Declarations {
    let mut table = DescriptorTable::new(interner.clone());
    let package = table.package("demo");
    let main = table.function("main", package, None);
    let x = table.variable("x", main);
    let outer = table.anonymous_function(Some(main), suspend_outer, None);
    let it = table.variable("it", outer);
    let inner = table.anonymous_function(Some(outer), false, None);
    Declarations {
        table,
        main,
        x,
        it,
        outer,
        inner,
    }
}

fn bind_all<'d>(body: &Body, decls: &'d Declarations) -> CodegenBinding<'d> {
    let mut binding = CodegenBinding::new(&decls.table, &CodegenOptions::default());
    binding.bind(body.outer_literal, decls.outer);
    binding.bind(body.inner_literal, decls.inner);
    binding.bind(body.x_decl, decls.x);
    for &node in &body.x_uses {
        binding.bind(node, decls.x);
    }
    binding.bind(body.it_param, decls.it);
    binding.bind(body.it_use, decls.it);
    binding
}

fn main_context(tree: &mut ContextTree, main: DescriptorId) -> ContextId {
    let lookup = tree.new_local_lookup();
    tree.new_declaration_context(OwnerKind::Package, main, None, lookup)
        .unwrap()
}

#[test]
fn nested_closures_and_captures() {
    let interner = SharedInterner::new();
    let body = body(&interner);
    let decls = declarations(&interner, false);
    let binding = bind_all(&body, &decls);
    let mut tree = ContextTree::new(&CodegenOptions::default());
    let root = main_context(&mut tree, decls.main);

    let emitted = ClosureWalker::new(&body.syntax, &binding, &mut tree)
        .walk(body.root, root, &mut no_visit)
        .unwrap();

    assert_eq!(emitted.len(), 2);
    let (inner, outer) = (&emitted[0], &emitted[1]);

    assert_eq!(inner.node, body.inner_literal);
    assert_eq!(inner.function_descriptor, decls.inner);
    assert_eq!(binding.class_name(inner.class), "demo$main$1$1");
    assert_eq!(inner.parent_class, Some(outer.class));
    assert_eq!(inner.captures, vec![decls.it, decls.x]);

    assert_eq!(outer.node, body.outer_literal);
    assert_eq!(binding.class_name(outer.class), "demo$main$1");
    assert_eq!(outer.kind, ClosureKind::Plain);
    assert_eq!(outer.parent_class, None);
    assert_eq!(outer.captures, vec![decls.x]);

    // Every closure context was popped again.
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.innermost(), Some(root));
}

#[test]
fn coroutine_literal_is_named_after_original() {
    let interner = SharedInterner::new();
    let body = body(&interner);
    let mut decls = declarations(&interner, true);
    let package = decls.table.containing(decls.main).unwrap();
    let original = decls.table.suspend_function("work", package, Some("Int"));
    let mut binding = bind_all(&body, &decls);
    binding.record_coroutine(decls.outer, original);
    let mut tree = ContextTree::new(&CodegenOptions::default());
    let root = main_context(&mut tree, decls.main);

    let emitted = ClosureWalker::new(&body.syntax, &binding, &mut tree)
        .walk(body.root, root, &mut no_visit)
        .unwrap();

    let outer = &emitted[1];
    assert_eq!(outer.kind, ClosureKind::Coroutine { original });
    assert_eq!(outer.class.callable(), original);
    assert_eq!(binding.class_name(outer.class), "demo$1");
    let return_type = outer.return_type.unwrap();
    assert_eq!(interner.lookup(return_type), "Int");
    // Classes nested in a coroutine body are named after the coroutine class.
    assert_eq!(emitted[0].parent_class, Some(outer.class));
    assert_eq!(binding.class_name(emitted[0].class), "demo$1$1");
}

#[test]
fn visitor_sees_live_closure_contexts() {
    let interner = SharedInterner::new();
    let body = body(&interner);
    let decls = declarations(&interner, false);
    let binding = bind_all(&body, &decls);
    let mut tree = ContextTree::new(&CodegenOptions::default());
    let root = main_context(&mut tree, decls.main);

    let mut seen = Vec::new();
    let mut visitor = |contexts: &ContextTree, closure: ContextId| -> Result<(), CodegenError> {
        let ctx = contexts.get(closure)?;
        seen.push((ctx.label(&binding), contexts.ancestors(closure).count()));
        Ok(())
    };
    ClosureWalker::new(&body.syntax, &binding, &mut tree)
        .walk(body.root, root, &mut visitor)
        .unwrap();

    assert_eq!(
        seen,
        vec![
            ("Closure: demo$main$1".to_string(), 2),
            ("Closure: demo$main$1$1".to_string(), 3),
        ]
    );
}

#[test]
fn visitor_error_aborts_walk() {
    let interner = SharedInterner::new();
    let body = body(&interner);
    let decls = declarations(&interner, false);
    let binding = bind_all(&body, &decls);
    let mut tree = ContextTree::new(&CodegenOptions::default());
    let root = main_context(&mut tree, decls.main);

    let failure = InternalError::UnknownContext {
        context: ContextId::new(42),
    };
    let mut visitor =
        |_: &ContextTree, _: ContextId| -> Result<(), CodegenError> { Err(failure.clone().into()) };
    let result = ClosureWalker::new(&body.syntax, &binding, &mut tree)
        .walk(body.root, root, &mut visitor);

    assert_eq!(result, Err(CodegenError::Internal(failure)));
}

#[test]
fn unbound_literal_is_internal_error() {
    let interner = SharedInterner::new();
    let body = body(&interner);
    let decls = declarations(&interner, false);
    let binding = CodegenBinding::new(&decls.table, &CodegenOptions::default());
    let mut tree = ContextTree::new(&CodegenOptions::default());
    let root = main_context(&mut tree, decls.main);

    let result = ClosureWalker::new(&body.syntax, &binding, &mut tree)
        .walk(body.root, root, &mut no_visit);

    assert_eq!(
        result,
        Err(CodegenError::Internal(InternalError::UnboundLiteral {
            node: body.outer_literal
        }))
    );
}

#[test]
fn labeled_and_callee_literals_are_closures() {
    // { a } { b } and f() loop@{ c }
    let interner = SharedInterner::new();
    let mut b = SyntaxTreeBuilder::new(interner.clone());
    b.start_node(SyntaxKind::SourceFile);

    b.start_node(SyntaxKind::CallExpr);
    b.start_node(SyntaxKind::FunctionLiteral);
    b.token(SyntaxKind::LBrace);
    b.leaf(SyntaxKind::NameRef, "a");
    b.token(SyntaxKind::RBrace);
    let callee = b.finish_node();
    b.space();
    b.start_node(SyntaxKind::FunctionLiteral);
    b.token(SyntaxKind::LBrace);
    b.leaf(SyntaxKind::NameRef, "b");
    b.token(SyntaxKind::RBrace);
    let trailing = b.finish_node();
    b.finish_node();

    b.start_node(SyntaxKind::CallExpr);
    b.leaf(SyntaxKind::NameRef, "f");
    b.start_node(SyntaxKind::ValueArgumentList);
    b.token(SyntaxKind::LParen);
    b.token(SyntaxKind::RParen);
    b.finish_node();
    b.space();
    b.start_node(SyntaxKind::LabeledExpr);
    b.leaf(SyntaxKind::LabelQualifier, "loop@");
    b.start_node(SyntaxKind::FunctionLiteral);
    b.token(SyntaxKind::LBrace);
    b.leaf(SyntaxKind::NameRef, "c");
    b.token(SyntaxKind::RBrace);
    let labeled = b.finish_node();
    b.finish_node();
    b.finish_node();

    let source = b.finish_node();
    let syntax = b.finish();

    let mut table = DescriptorTable::new(interner.clone());
    let package = table.package("demo");
    let main = table.function("main", package, None);
    let literals: Vec<_> = (0..3)
        .map(|_| table.anonymous_function(Some(main), false, None))
        .collect();

    let mut binding = CodegenBinding::new(&table, &CodegenOptions::default());
    for (&node, &literal) in [callee, trailing, labeled].iter().zip(&literals) {
        binding.bind(node, literal);
    }
    let mut tree = ContextTree::new(&CodegenOptions::default());
    let root = main_context(&mut tree, main);

    let emitted = ClosureWalker::new(&syntax, &binding, &mut tree)
        .walk(source, root, &mut no_visit)
        .unwrap();

    let nodes: Vec<_> = emitted.iter().map(|c| c.node).collect();
    assert_eq!(nodes, vec![callee, trailing, labeled]);
    let names: Vec<_> = emitted.iter().map(|c| binding.class_name(c.class)).collect();
    assert_eq!(names, vec!["demo$main$1", "demo$main$2", "demo$main$3"]);
}

#[test]
fn unreported_call_children_are_walked() {
    // val x = 1
    // run { g() lbl@x }
    // { a } ({ b })
    let interner = SharedInterner::new();
    let mut b = SyntaxTreeBuilder::new(interner.clone());
    b.start_node(SyntaxKind::SourceFile);

    b.start_node(SyntaxKind::VariableDecl);
    b.leaf(SyntaxKind::Ident, "x");
    b.token(SyntaxKind::Eq);
    b.leaf(SyntaxKind::IntLiteral, "1");
    let x_decl = b.finish_node();

    b.start_node(SyntaxKind::CallExpr);
    b.leaf(SyntaxKind::NameRef, "run");
    b.space();
    b.start_node(SyntaxKind::FunctionLiteral);
    b.token(SyntaxKind::LBrace);
    b.start_node(SyntaxKind::CallExpr);
    b.leaf(SyntaxKind::NameRef, "g");
    b.start_node(SyntaxKind::ValueArgumentList);
    b.token(SyntaxKind::LParen);
    b.token(SyntaxKind::RParen);
    b.finish_node();
    b.space();
    b.start_node(SyntaxKind::LabeledExpr);
    b.leaf(SyntaxKind::LabelQualifier, "lbl@");
    let x_use = b.leaf(SyntaxKind::NameRef, "x");
    b.finish_node();
    b.finish_node();
    b.token(SyntaxKind::RBrace);
    let run_literal = b.finish_node();
    b.finish_node();

    b.start_node(SyntaxKind::CallExpr);
    b.start_node(SyntaxKind::FunctionLiteral);
    b.token(SyntaxKind::LBrace);
    b.leaf(SyntaxKind::NameRef, "a");
    b.token(SyntaxKind::RBrace);
    let callee = b.finish_node();
    b.space();
    b.start_node(SyntaxKind::ParenExpr);
    b.token(SyntaxKind::LParen);
    b.start_node(SyntaxKind::FunctionLiteral);
    b.token(SyntaxKind::LBrace);
    b.leaf(SyntaxKind::NameRef, "b");
    b.token(SyntaxKind::RBrace);
    let parenthesized = b.finish_node();
    b.token(SyntaxKind::RParen);
    b.finish_node();
    b.finish_node();

    let source = b.finish_node();
    let syntax = b.finish();

    let mut table = DescriptorTable::new(interner.clone());
    let package = table.package("demo");
    let main = table.function("main", package, None);
    let x = table.variable("x", main);
    let literals: Vec<_> = (0..3)
        .map(|_| table.anonymous_function(Some(main), false, None))
        .collect();

    let mut binding = CodegenBinding::new(&table, &CodegenOptions::default());
    binding.bind(x_decl, x);
    binding.bind(x_use, x);
    for (&node, &literal) in [run_literal, callee, parenthesized].iter().zip(&literals) {
        binding.bind(node, literal);
    }
    let mut tree = ContextTree::new(&CodegenOptions::default());
    let root = main_context(&mut tree, main);

    let emitted = ClosureWalker::new(&syntax, &binding, &mut tree)
        .walk(source, root, &mut no_visit)
        .unwrap();

    let nodes: Vec<_> = emitted.iter().map(|c| c.node).collect();
    assert_eq!(nodes, vec![run_literal, callee, parenthesized]);
    assert_eq!(emitted[0].captures, vec![x]);
    assert!(emitted[2].captures.is_empty());
}
