//! Hierarchy resolution: from a handler class to the type expression of its response.
//!
//! Handlers declare their contract as the generic arguments of a shared base class,
//! `class GetInfo extends Base<Req, Res>`. Intermediate bases are allowed at any depth and
//! in any module:
//!
//! ```text
//! class SendPrivateMsg extends SendMsgBase {}
//! class SendMsgBase extends Base<SendMsgReq, SendMsgRes> {}
//! ```
//!
//! The resolver follows the `extends` clause of each class until it finds one with
//! exactly two type arguments, and returns the second one scoped to the module where it
//! was written. `implements` clauses are ignored. A chain that ends in an unresolvable
//! supertype with some other number of arguments is reported as an unsupported shape
//! instead of being guessed at. Generic intermediate bases get their type parameters bound
//! to what the subclass passed.

use log::debug;
use std::collections::HashSet;

use crate::ir::{Binding, DeclarationKey, Scope, TypeExpression};
use crate::oracle::{OracleError, TypeOracle};
use crate::syntax::{DeclarationBody, Keyword, TypeNode, TypeReference};

/// The response expression of a handler and how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseBinding {
    /// The handler class itself
    pub class: DeclarationKey,
    /// Class whose supertype carried the two type arguments
    pub ancestor: DeclarationKey,
    /// Second type argument, scoped to `ancestor`'s module
    pub expression: TypeExpression,
    /// Number of supertype hops taken before the match
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HierarchyError {
    #[error("class `{name}` not found in the project")]
    ClassNotFound { name: String },
    #[error("{class} has no supertype with two type arguments")]
    NoHeritage { class: DeclarationKey },
    #[error("supertype `{name}` of {class} cannot be resolved")]
    UnresolvedSupertype { class: DeclarationKey, name: String },
    #[error("supertype `{name}` of {class} cannot be followed and has {arity} type argument(s)")]
    UnsupportedShape {
        class: DeclarationKey,
        name: String,
        arity: usize,
    },
    #[error("{key} is a {kind}, not a class")]
    NotAClass { key: DeclarationKey, kind: &'static str },
    #[error("inheritance cycle through {class}")]
    Cycle { class: DeclarationKey },
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl HierarchyError {
    /// Oracle failures abort the run, everything else only skips the handler.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HierarchyError::Oracle(_))
    }
}

pub struct HierarchyResolver<'o> {
    oracle: &'o dyn TypeOracle,
}

impl<'o> HierarchyResolver<'o> {
    pub fn new(oracle: &'o dyn TypeOracle) -> Self {
        Self { oracle }
    }

    /// Resolves the response expression of the class called `class_name`.
    pub fn resolve(&self, class_name: &str) -> Result<ResponseBinding, HierarchyError> {
        let class = self
            .oracle
            .find_class(class_name)
            .ok_or_else(|| HierarchyError::ClassNotFound {
                name: class_name.to_string(),
            })?;
        self.resolve_key(class)
    }

    /// Resolves the response expression of a known class declaration.
    pub fn resolve_key(&self, class: DeclarationKey) -> Result<ResponseBinding, HierarchyError> {
        let mut current = class.clone();
        let mut scope = Scope::new(current.module.clone());
        let mut visited = HashSet::new();
        let mut depth = 0;

        loop {
            if !visited.insert(current.clone()) {
                return Err(HierarchyError::Cycle { class: current });
            }

            let declaration = self.oracle.declaration(&current)?;
            let DeclarationBody::Class {
                extends, implements, ..
            } = &declaration.syntax.body
            else {
                return Err(HierarchyError::NotAClass {
                    key: current,
                    kind: declaration.syntax.body.kind_name(),
                });
            };
            let Some(target) = extends else {
                return Err(HierarchyError::NoHeritage { class: current });
            };
            if !implements.is_empty() {
                debug!("{}: ignoring implemented interfaces", current);
            }

            if target.args.len() == 2 {
                debug!("{}: response found on {} after {} step(s)", class, current, depth);
                return Ok(ResponseBinding {
                    class,
                    ancestor: current,
                    expression: TypeExpression {
                        node: target.args[1].clone(),
                        scope,
                    },
                    depth,
                });
            }

            let Some(parent) = self.resolve_supertype(&current, target) else {
                return Err(match target.args.len() {
                    0 => HierarchyError::UnresolvedSupertype {
                        class: current,
                        name: target.name.clone(),
                    },
                    arity => HierarchyError::UnsupportedShape {
                        class: current,
                        name: target.name.clone(),
                        arity,
                    },
                });
            };

            debug!("{} extends {}", current, parent);
            scope = self.bind_parameters(&parent, target, &scope)?;
            current = parent;
            depth += 1;
        }
    }

    fn resolve_supertype(&self, class: &DeclarationKey, target: &TypeReference) -> Option<DeclarationKey> {
        match &target.specifier {
            Some(specifier) => self.oracle.resolve_import(&class.module, specifier, &target.name),
            None => self.oracle.resolve_name(&class.module, &target.name),
        }
    }

    /// Scope of `parent` with its type parameters bound to the arguments in `target`.
    ///
    /// Arguments stay unevaluated and remember the subclass scope they were written in.
    /// Missing arguments fall back to the parameter default, or to `unknown`.
    fn bind_parameters(
        &self,
        parent: &DeclarationKey,
        target: &TypeReference,
        subclass_scope: &Scope,
    ) -> Result<Scope, HierarchyError> {
        let declaration = self.oracle.declaration(parent)?;
        let mut bindings: Vec<(String, Binding)> = Vec::with_capacity(declaration.syntax.type_params.len());
        for (index, param) in declaration.syntax.type_params.iter().enumerate() {
            let expression = match (target.args.get(index), &param.default) {
                (Some(arg), _) => TypeExpression {
                    node: arg.clone(),
                    scope: subclass_scope.clone(),
                },
                (None, Some(default)) => TypeExpression {
                    node: default.clone(),
                    scope: Scope::with_bindings(parent.module.clone(), bindings.clone()),
                },
                (None, None) => TypeExpression {
                    node: TypeNode::Keyword(Keyword::Unknown),
                    scope: Scope::new(parent.module.clone()),
                },
            };
            bindings.push((param.name.clone(), Binding::Deferred(expression)));
        }
        Ok(Scope::with_bindings(parent.module.clone(), bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ModulePath;
    use crate::oracle::ProjectIndex;
    use crate::parser::SourceParser;
    use crate::syntax::{parse_module, parse_type, TypeReference};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn index(files: &[(&str, &str)]) -> ProjectIndex {
        let parsed = files
            .iter()
            .map(|(module, source)| SourceParser::parse_source(ModulePath::new(*module), source).unwrap())
            .collect();
        ProjectIndex::build(parsed, &IndexMap::new()).unwrap()
    }

    const BASE: (&str, &str) = ("src/base", "export abstract class Base<Req, Res> {}");

    #[test]
    fn test_direct_resolution_returns_argument_verbatim() {
        let index = index(&[
            BASE,
            (
                "src/action/GetInfo",
                "import { Base } from '../base';\nexport class GetInfo extends Base<void, { id: string; time: Date }> {}",
            ),
        ]);
        let binding = HierarchyResolver::new(&index).resolve("GetInfo").unwrap();
        assert_eq!(binding.depth, 0);
        assert_eq!(binding.expression.node, parse_type("{ id: string; time: Date }").unwrap());
        assert_eq!(binding.expression.scope.module.as_str(), "src/action/GetInfo");
        assert_eq!(binding.ancestor, binding.class);
    }

    #[test]
    fn test_depth_two_resolution_across_modules() {
        let index = index(&[
            BASE,
            (
                "src/msg/SendMsgBase",
                "import { Base } from '../base';\nimport { SharedPayload } from './types';\nexport class SendMsgBase extends Base<unknown, SharedPayload> {}",
            ),
            ("src/msg/Mid", "import { SendMsgBase } from './SendMsgBase';\nexport class Mid extends SendMsgBase {}"),
            ("src/msg/SendMsg", "import { Mid } from './Mid';\nexport class SendMsg extends Mid {}"),
        ]);
        let binding = HierarchyResolver::new(&index).resolve("SendMsg").unwrap();
        assert_eq!(binding.depth, 2);
        assert_eq!(binding.ancestor.symbol, "SendMsgBase");
        assert_eq!(binding.expression.scope.module.as_str(), "src/msg/SendMsgBase");
        assert_eq!(
            binding.expression.node,
            TypeNode::Reference(TypeReference::named("SharedPayload"))
        );
    }

    #[test]
    fn test_generic_intermediate_base_binds_parameter() {
        let index = index(&[
            BASE,
            ("src/mid", "import { Base } from './base';\nexport class Mid<T> extends Base<string, T> {}"),
            ("src/leaf", "import { Mid } from './mid';\nexport class Leaf extends Mid<{ ok: boolean }> {}"),
        ]);
        let binding = HierarchyResolver::new(&index).resolve("Leaf").unwrap();
        assert_eq!(binding.depth, 1);
        assert_eq!(binding.expression.node, TypeNode::Reference(TypeReference::named("T")));
        let Some(Binding::Deferred(bound)) = binding.expression.scope.lookup("T") else {
            panic!("T should be bound");
        };
        assert_eq!(bound.node, parse_type("{ ok: boolean }").unwrap());
        assert_eq!(bound.scope.module.as_str(), "src/leaf");
    }

    #[test]
    fn test_broken_chain_reports_unresolved_supertype() {
        let index = index(&[("src/a", "import { Gone } from './missing';\nexport class Broken extends Gone {}")]);
        let err = HierarchyResolver::new(&index).resolve("Broken").unwrap_err();
        assert!(matches!(err, HierarchyError::UnresolvedSupertype { ref name, .. } if name == "Gone"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unsupported_arity_at_unresolvable_terminal() {
        let index = index(&[("src/a", "export class Odd extends External<A> {}")]);
        let err = HierarchyResolver::new(&index).resolve("Odd").unwrap_err();
        assert!(matches!(err, HierarchyError::UnsupportedShape { arity: 1, .. }));
    }

    #[test]
    fn test_class_without_heritage_and_missing_class() {
        let index = index(&[("src/a", "export class Plain {}")]);
        let resolver = HierarchyResolver::new(&index);
        assert!(matches!(resolver.resolve("Plain"), Err(HierarchyError::NoHeritage { .. })));
        assert!(matches!(resolver.resolve("Nope"), Err(HierarchyError::ClassNotFound { .. })));
    }

    #[test]
    fn test_implements_ignored() {
        let index = index(&[
            BASE,
            (
                "src/a",
                "import { Base } from './base';\ninterface Marker {}\nexport class A extends Base<void, string> implements Marker {}",
            ),
            ("src/c", "interface Marker {}\nexport class C implements Marker {}"),
        ]);
        let resolver = HierarchyResolver::new(&index);
        assert_eq!(resolver.resolve("A").unwrap().depth, 0);
        assert!(parse_module("export class B extends X<1, 2>, Y<3, 4> {}").is_err());
        assert!(matches!(resolver.resolve("C"), Err(HierarchyError::NoHeritage { .. })));
    }

    #[test]
    fn test_cycle_and_non_class_supertype() {
        let index = index(&[
            ("src/a", "export class A extends B {}\nexport class B extends A {}"),
            ("src/c", "interface I {}\nexport class C extends I {}"),
        ]);
        let resolver = HierarchyResolver::new(&index);
        assert!(matches!(resolver.resolve("A"), Err(HierarchyError::Cycle { .. })));
        assert!(matches!(
            resolver.resolve("C"),
            Err(HierarchyError::NotAClass { kind: "interface", .. })
        ));
    }
}
