//! AST nodes (component G): an arena-indexed tree for top declarations,
//! imports, and build-guard expressions.
//!
//! Grounded on `semantics/ast.{hpp,cpp}`. Nodes are stored in flat vectors
//! inside `Ast` and referenced by small index types rather than pointers,
//! matching the teacher's arena style elsewhere in the workspace.

use crate::datum::{Datum, DatumError, DatumNamespace};
use crate::errors::{ErrorCode, ErrorList};
use crate::util::fqname::Fqname;
use crate::util::semver::SemanticVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImportId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone)]
pub enum GuardExpr {
    Name(Fqname),
    Integer(i64),
    Version(SemanticVersion),
    Str(String),
    Not(GuardId),
    In { lhs: GuardId, rhs: GuardId, negate: bool },
    Relational { op: RelOp, lhs: GuardId, rhs: GuardId },
    Equality { op: EqOp, lhs: GuardId, rhs: GuardId },
    And(GuardId, GuardId),
    Or(GuardId, GuardId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopKind {
    Module,
    Program,
    Library,
}

#[derive(Debug, Clone)]
pub struct TopNode {
    pub kind: TopKind,
    pub module_name: Option<Fqname>,
    pub string_name: Option<String>,
    pub application_or_library: Option<String>,
    pub version: Option<SemanticVersion>,
    pub fallback: bool,
    pub guard: Option<GuardId>,
    pub first_byte: usize,
    pub last_byte: usize,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum ImportKind {
    Git { url: String, rev: String },
    Zip { url: String },
    Lib { path: String },
    Module { name: Fqname, alias: Option<Fqname> },
}

#[derive(Debug, Clone)]
pub struct ImportNode {
    pub kind: ImportKind,
    pub guard: Option<GuardId>,
    pub first_byte: usize,
    pub last_byte: usize,
    pub enabled: Option<bool>,
}

#[derive(Debug, Default)]
pub struct Ast {
    guards: Vec<GuardExpr>,
    tops: Vec<TopNode>,
    imports: Vec<ImportNode>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn push_guard(&mut self, expr: GuardExpr) -> GuardId {
        self.guards.push(expr);
        GuardId((self.guards.len() - 1) as u32)
    }

    pub fn push_top(&mut self, node: TopNode) -> TopId {
        self.tops.push(node);
        TopId((self.tops.len() - 1) as u32)
    }

    pub fn push_import(&mut self, node: ImportNode) -> ImportId {
        self.imports.push(node);
        ImportId((self.imports.len() - 1) as u32)
    }

    pub fn guard(&self, id: GuardId) -> &GuardExpr {
        &self.guards[id.0 as usize]
    }

    pub fn top(&self, id: TopId) -> &TopNode {
        &self.tops[id.0 as usize]
    }

    pub fn top_mut(&mut self, id: TopId) -> &mut TopNode {
        &mut self.tops[id.0 as usize]
    }

    pub fn import(&self, id: ImportId) -> &ImportNode {
        &self.imports[id.0 as usize]
    }

    pub fn import_mut(&mut self, id: ImportId) -> &mut ImportNode {
        &mut self.imports[id.0 as usize]
    }

    pub fn tops(&self) -> impl Iterator<Item = (TopId, &TopNode)> {
        self.tops.iter().enumerate().map(|(i, n)| (TopId(i as u32), n))
    }

    pub fn imports(&self) -> impl Iterator<Item = (ImportId, &ImportNode)> {
        self.imports
            .iter()
            .enumerate()
            .map(|(i, n)| (ImportId(i as u32), n))
    }

    /// Direct children of a guard node, for generic lazy traversal.
    pub fn guard_children(&self, id: GuardId) -> Vec<GuardId> {
        match self.guard(id) {
            GuardExpr::Name(_) | GuardExpr::Integer(_) | GuardExpr::Version(_) | GuardExpr::Str(_) => vec![],
            GuardExpr::Not(inner) => vec![*inner],
            GuardExpr::In { lhs, rhs, .. } => vec![*lhs, *rhs],
            GuardExpr::Relational { lhs, rhs, .. } => vec![*lhs, *rhs],
            GuardExpr::Equality { lhs, rhs, .. } => vec![*lhs, *rhs],
            GuardExpr::And(a, b) | GuardExpr::Or(a, b) => vec![*a, *b],
        }
    }

    fn eval_guard(&self, id: GuardId, env: &DatumNamespace) -> Result<Datum, DatumError> {
        match self.guard(id) {
            GuardExpr::Name(name) => Ok(env.get(&name.to_string()).cloned().unwrap_or(Datum::Unknown)),
            GuardExpr::Integer(i) => Ok(Datum::Integer(*i)),
            GuardExpr::Version(v) => Ok(Datum::Version(v.clone())),
            GuardExpr::Str(s) => Ok(Datum::String(s.clone())),
            GuardExpr::Not(inner) => {
                let v = self.eval_guard(*inner, env)?;
                Ok(Datum::Bool(!v.to_bool()))
            }
            GuardExpr::In { lhs, rhs, negate } => {
                let l = self.eval_guard(*lhs, env)?;
                let r = self.eval_guard(*rhs, env)?;
                let result = l.contained_in(&r)?;
                Ok(Datum::Bool(result != *negate))
            }
            GuardExpr::Relational { op, lhs, rhs } => {
                let l = self.eval_guard(*lhs, env)?;
                let r = self.eval_guard(*rhs, env)?;
                let ord = l.datum_cmp(&r)?;
                let result = match op {
                    RelOp::Lt => ord.is_lt(),
                    RelOp::Le => ord.is_le(),
                    RelOp::Gt => ord.is_gt(),
                    RelOp::Ge => ord.is_ge(),
                };
                Ok(Datum::Bool(result))
            }
            GuardExpr::Equality { op, lhs, rhs } => {
                let l = self.eval_guard(*lhs, env)?;
                let r = self.eval_guard(*rhs, env)?;
                let eq = l.datum_eq(&r)?;
                Ok(Datum::Bool(match op {
                    EqOp::Eq => eq,
                    EqOp::Ne => !eq,
                }))
            }
            GuardExpr::And(a, b) => {
                let l = self.eval_guard(*a, env)?;
                if !l.to_bool() {
                    return Ok(Datum::Bool(false));
                }
                let r = self.eval_guard(*b, env)?;
                Ok(Datum::Bool(r.to_bool()))
            }
            GuardExpr::Or(a, b) => {
                let l = self.eval_guard(*a, env)?;
                if l.to_bool() {
                    return Ok(Datum::Bool(true));
                }
                let r = self.eval_guard(*b, env)?;
                Ok(Datum::Bool(r.to_bool()))
            }
        }
    }

    /// Evaluates every top and import node's build guard against `env`,
    /// setting `enabled` on each. A missing guard means "always enabled".
    /// Evaluation errors disable the node and are logged to `errors`.
    pub fn evaluate_build_guard(&mut self, env: &DatumNamespace, errors: &mut ErrorList) {
        for i in 0..self.tops.len() {
            let id = TopId(i as u32);
            let (guard, first, last) = {
                let node = self.top(id);
                (node.guard, node.first_byte, node.last_byte)
            };
            let enabled = match guard {
                None => true,
                Some(g) => match self.eval_guard(g, env) {
                    Ok(v) => v.to_bool(),
                    Err(_) => {
                        errors.add(first, last, ErrorCode::InvalidOperandTypes, None);
                        false
                    }
                },
            };
            self.top_mut(id).enabled = Some(enabled);
        }

        for i in 0..self.imports.len() {
            let id = ImportId(i as u32);
            let (guard, first, last) = {
                let node = self.import(id);
                (node.guard, node.first_byte, node.last_byte)
            };
            let enabled = match guard {
                None => true,
                Some(g) => match self.eval_guard(g, env) {
                    Ok(v) => v.to_bool(),
                    Err(_) => {
                        errors.add(first, last, ErrorCode::InvalidOperandTypes, None);
                        false
                    }
                },
            };
            self.import_mut(id).enabled = Some(enabled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_guard_is_always_enabled() {
        let mut ast = Ast::new();
        let top = ast.push_top(TopNode {
            kind: TopKind::Module,
            module_name: Some(Fqname::parse(".a")),
            string_name: None,
            application_or_library: None,
            version: None,
            fallback: false,
            guard: None,
            first_byte: 0,
            last_byte: 1,
            enabled: None,
        });
        let mut errors = ErrorList::new();
        ast.evaluate_build_guard(&DatumNamespace::new(), &mut errors);
        assert_eq!(ast.top(top).enabled, Some(true));
    }

    #[test]
    fn and_short_circuits_on_false_lhs() {
        let mut ast = Ast::new();
        let f = ast.push_guard(GuardExpr::Integer(0));
        let t = ast.push_guard(GuardExpr::Integer(1));
        let and = ast.push_guard(GuardExpr::And(f, t));
        let env = DatumNamespace::new();
        let result = ast.eval_guard(and, &env).unwrap();
        assert_eq!(result, Datum::Bool(false));
    }

    #[test]
    fn name_resolves_against_environment() {
        let mut ast = Ast::new();
        let name = ast.push_guard(GuardExpr::Name(Fqname::parse(".platform")));
        let mut env = DatumNamespace::new();
        env.set(".platform", Datum::String("linux".into()));
        let result = ast.eval_guard(name, &env).unwrap();
        assert_eq!(result, Datum::String("linux".into()));
    }
}
