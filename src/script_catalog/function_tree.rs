//! `extractFunctionTree`: AST-based function discovery and a BFS call
//! graph rooted at a named function, via `oxc_parser`/`oxc_ast`.
//!
//! Scope note: call-site discovery walks statement bodies and the common
//! expression forms (assignments, binary/logical/unary, return, await,
//! call callees); it does not descend into call arguments or object/array
//! literal contents. Good enough for the identifier-based dependency set
//! the call graph needs; it is not a full control-flow analysis.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, Expression, Function, Program, Statement, VariableDeclarator,
};
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::Serialize;

use crate::error::{Result, ServerError};

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub max_depth: usize,
    pub max_size: usize,
    pub include_comments: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_size: 256 * 1024,
            include_comments: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionNode {
    pub name: String,
    pub source: String,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionTree {
    pub root: String,
    pub nodes: Vec<FunctionNode>,
    pub call_graph: HashMap<String, Vec<String>>,
    pub total_size: usize,
    pub size_warning: Option<String>,
}

struct FunctionInfo {
    name: String,
    start: u32,
    end: u32,
    deps: BTreeSet<String>,
}

struct Collector {
    functions: Vec<FunctionInfo>,
    stack: Vec<usize>,
}

impl Collector {
    fn new() -> Self {
        Self {
            functions: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn walk_program(&mut self, program: &Program<'_>) {
        self.walk_statements(&program.body);
    }

    fn walk_statements(&mut self, stmts: &[Statement<'_>]) {
        for stmt in stmts {
            self.walk_statement(stmt);
        }
    }

    fn walk_statement(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::FunctionDeclaration(func) => self.walk_named_function(func),
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    self.walk_variable_declarator(declarator);
                }
            }
            Statement::ExpressionStatement(expr_stmt) => {
                self.walk_expression(&expr_stmt.expression)
            }
            Statement::BlockStatement(block) => self.walk_statements(&block.body),
            Statement::IfStatement(if_stmt) => {
                self.walk_expression(&if_stmt.test);
                self.walk_statement(&if_stmt.consequent);
                if let Some(alt) = &if_stmt.alternate {
                    self.walk_statement(alt);
                }
            }
            Statement::ReturnStatement(ret) => {
                if let Some(arg) = &ret.argument {
                    self.walk_expression(arg);
                }
            }
            Statement::WhileStatement(w) => {
                self.walk_expression(&w.test);
                self.walk_statement(&w.body);
            }
            Statement::DoWhileStatement(w) => {
                self.walk_expression(&w.test);
                self.walk_statement(&w.body);
            }
            Statement::ForStatement(f) => {
                if let Some(test) = &f.test {
                    self.walk_expression(test);
                }
                self.walk_statement(&f.body);
            }
            Statement::ForInStatement(f) => {
                self.walk_expression(&f.right);
                self.walk_statement(&f.body);
            }
            Statement::ForOfStatement(f) => {
                self.walk_expression(&f.right);
                self.walk_statement(&f.body);
            }
            Statement::TryStatement(t) => {
                self.walk_statements(&t.block.body);
                if let Some(handler) = &t.handler {
                    self.walk_statements(&handler.body.body);
                }
                if let Some(finalizer) = &t.finalizer {
                    self.walk_statements(&finalizer.body);
                }
            }
            Statement::SwitchStatement(s) => {
                self.walk_expression(&s.discriminant);
                for case in &s.cases {
                    self.walk_statements(&case.consequent);
                }
            }
            Statement::LabeledStatement(l) => self.walk_statement(&l.body),
            _ => {}
        }
    }

    fn walk_variable_declarator(&mut self, decl: &VariableDeclarator<'_>) {
        let Some(init) = &decl.init else { return };
        let is_function_valued = matches!(
            init,
            Expression::FunctionExpression(_) | Expression::ArrowFunctionExpression(_)
        );
        if is_function_valued {
            if let BindingPatternKind::BindingIdentifier(ident) = &decl.id.kind {
                let name = ident.name.to_string();
                match init {
                    Expression::FunctionExpression(func) => {
                        self.enter_function(name, func.span.start, func.span.end, |c| {
                            if let Some(body) = &func.body {
                                c.walk_statements(&body.statements);
                            }
                        });
                    }
                    Expression::ArrowFunctionExpression(arrow) => {
                        self.enter_function(
                            name,
                            arrow.span.start,
                            arrow.span.end,
                            |c| c.walk_statements(&arrow.body.statements),
                        );
                    }
                    _ => unreachable!(),
                }
                return;
            }
        }
        self.walk_expression(init);
    }

    fn walk_named_function(&mut self, func: &Function<'_>) {
        let Some(id) = &func.id else {
            if let Some(body) = &func.body {
                self.walk_statements(&body.statements);
            }
            return;
        };
        let name = id.name.to_string();
        let (start, end) = (func.span.start, func.span.end);
        self.enter_function(name, start, end, |c| {
            if let Some(body) = &func.body {
                c.walk_statements(&body.statements);
            }
        });
    }

    fn enter_function(
        &mut self,
        name: String,
        start: u32,
        end: u32,
        body: impl FnOnce(&mut Self),
    ) {
        self.functions.push(FunctionInfo {
            name,
            start,
            end,
            deps: BTreeSet::new(),
        });
        self.stack.push(self.functions.len() - 1);
        body(self);
        self.stack.pop();
    }

    fn walk_expression(&mut self, expr: &Expression<'_>) {
        match expr {
            Expression::CallExpression(call) => {
                if let Expression::Identifier(ident) = &call.callee {
                    if let Some(&idx) = self.stack.last() {
                        self.functions[idx].deps.insert(ident.name.to_string());
                    }
                }
                self.walk_expression(&call.callee);
            }
            Expression::FunctionExpression(func) => {
                // Anonymous inline function: attribute its body's calls to
                // the enclosing named function rather than pushing a new one.
                if let Some(body) = &func.body {
                    self.walk_statements(&body.statements);
                }
            }
            Expression::ArrowFunctionExpression(arrow) => {
                self.walk_statements(&arrow.body.statements);
            }
            Expression::AssignmentExpression(assign) => self.walk_expression(&assign.right),
            Expression::BinaryExpression(bin) => {
                self.walk_expression(&bin.left);
                self.walk_expression(&bin.right);
            }
            Expression::LogicalExpression(logical) => {
                self.walk_expression(&logical.left);
                self.walk_expression(&logical.right);
            }
            Expression::UnaryExpression(unary) => self.walk_expression(&unary.argument),
            Expression::AwaitExpression(await_expr) => self.walk_expression(&await_expr.argument),
            Expression::ConditionalExpression(cond) => {
                self.walk_expression(&cond.test);
                self.walk_expression(&cond.consequent);
                self.walk_expression(&cond.alternate);
            }
            Expression::SequenceExpression(seq) => {
                for e in &seq.expressions {
                    self.walk_expression(e);
                }
            }
            _ => {}
        }
    }
}

pub fn extract_function_tree(
    source: &str,
    function_name: &str,
    opts: ExtractOptions,
) -> Result<FunctionTree> {
    let allocator = Allocator::default();
    let source_type = SourceType::default();
    let parsed = Parser::new(&allocator, source, source_type).parse();

    if !parsed.errors.is_empty() {
        let messages: Vec<String> = parsed.errors.iter().map(|e| e.to_string()).collect();
        return Err(ServerError::InvalidArgument(format!(
            "script did not parse as JavaScript: {}",
            messages.join("; ")
        )));
    }

    let mut collector = Collector::new();
    collector.walk_program(&parsed.program);

    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (idx, info) in collector.functions.iter().enumerate() {
        by_name.insert(info.name.clone(), idx);
    }

    if !by_name.contains_key(function_name) {
        return Err(ServerError::NotFound(format!(
            "function `{function_name}` not found in script"
        )));
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((function_name.to_string(), 0));
    visited.insert(function_name.to_string());

    let mut ordered_names = Vec::new();
    while let Some((name, depth)) = queue.pop_front() {
        ordered_names.push(name.clone());
        if depth >= opts.max_depth {
            continue;
        }
        let Some(&idx) = by_name.get(&name) else { continue };
        for dep in &collector.functions[idx].deps {
            if by_name.contains_key(dep) && visited.insert(dep.clone()) {
                queue.push_back((dep.clone(), depth + 1));
            }
        }
    }

    let mut nodes = Vec::new();
    let mut call_graph = HashMap::new();
    let mut total_size = 0usize;

    for name in &ordered_names {
        let idx = by_name[name];
        let info = &collector.functions[idx];
        let mut body = source
            .get(info.start as usize..info.end as usize)
            .unwrap_or_default()
            .to_string();
        if !opts.include_comments {
            body = strip_line_comments(&body);
        }
        total_size += body.len();
        let deps: Vec<String> = info.deps.iter().cloned().collect();
        call_graph.insert(name.clone(), deps.clone());
        nodes.push(FunctionNode {
            name: name.clone(),
            source: body,
            dependencies: deps,
        });
    }

    let size_warning = if total_size > opts.max_size {
        Some(format!(
            "extracted function tree is {total_size} bytes, exceeding the requested {} byte budget; not truncated",
            opts.max_size
        ))
    } else {
        None
    };

    Ok(FunctionTree {
        root: function_name.to_string(),
        nodes,
        call_graph,
        total_size,
        size_warning,
    })
}

fn strip_line_comments(src: &str) -> String {
    src.lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        function decryptPayload(buf) {
            return xorDecrypt(buf, getKey());
        }

        function xorDecrypt(buf, key) {
            return buf;
        }

        const getKey = () => fetchKeyFromCache();

        function fetchKeyFromCache() {
            return 42;
        }

        function unrelated() {
            return 1;
        }
    "#;

    #[test]
    fn builds_call_graph_via_bfs() {
        let tree = extract_function_tree(
            SAMPLE,
            "decryptPayload",
            ExtractOptions {
                max_depth: 3,
                ..ExtractOptions::default()
            },
        )
        .unwrap();

        let names: HashSet<_> = tree.nodes.iter().map(|n| n.name.clone()).collect();
        assert!(names.contains("decryptPayload"));
        assert!(names.contains("xorDecrypt"));
        assert!(names.contains("getKey"));
        assert!(names.contains("fetchKeyFromCache"));
        assert!(!names.contains("unrelated"));
    }

    #[test]
    fn respects_max_depth() {
        let tree = extract_function_tree(
            SAMPLE,
            "decryptPayload",
            ExtractOptions {
                max_depth: 1,
                ..ExtractOptions::default()
            },
        )
        .unwrap();
        let names: HashSet<_> = tree.nodes.iter().map(|n| n.name.clone()).collect();
        assert!(names.contains("decryptPayload"));
        assert!(names.contains("xorDecrypt"));
        assert!(names.contains("getKey"));
        assert!(!names.contains("fetchKeyFromCache"));
    }

    #[test]
    fn unknown_function_is_not_found() {
        let err = extract_function_tree(SAMPLE, "doesNotExist", ExtractOptions::default())
            .unwrap_err();
        assert_eq!(err.category(), "not_found");
    }

    #[test]
    fn warns_without_truncating_past_max_size() {
        let tree = extract_function_tree(
            SAMPLE,
            "decryptPayload",
            ExtractOptions {
                max_size: 10,
                ..ExtractOptions::default()
            },
        )
        .unwrap();
        assert!(tree.size_warning.is_some());
        assert!(tree.nodes.iter().all(|n| !n.source.is_empty()));
    }
}
