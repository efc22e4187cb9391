// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Import and export declarations.

use super::Parser;
use super::statements::NameRule;
use crate::ast::{NodeId, NodeKind, VariableKind};
use crate::error::Result;
use crate::lexer::TokenKind;

impl<'a> Parser<'a> {
    /// Parses an `import` declaration.
    pub(super) fn parse_import_declaration(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'import'

        // import 'side-effect';
        if let TokenKind::String(source) = &self.current.kind {
            let source = source.clone();
            self.advance();
            self.consume_semicolon()?;
            return Ok(self.node(
                NodeKind::ImportDeclaration {
                    specifiers: Vec::new(),
                    source,
                },
                start,
            ));
        }

        let mut specifiers = Vec::new();

        if self.at_binding_identifier() {
            let spec_start = self.current.span.start;
            let local = self.expect_binding_identifier()?;
            specifiers.push(self.node(NodeKind::ImportDefaultSpecifier { local }, spec_start));
            if !self.eat(&TokenKind::Comma) {
                return self.finish_import(start, specifiers);
            }
        }

        if self.check(&TokenKind::Star) {
            let spec_start = self.current.span.start;
            self.advance();
            self.expect_contextual("as")?;
            let local = self.expect_binding_identifier()?;
            specifiers.push(self.node(NodeKind::ImportNamespaceSpecifier { local }, spec_start));
        } else if self.eat(&TokenKind::LeftBrace) {
            while !self.check(&TokenKind::RightBrace) {
                specifiers.push(self.parse_import_specifier()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RightBrace)?;
        } else {
            return Err(self.unexpected());
        }

        self.finish_import(start, specifiers)
    }

    /// Parses `from 'source';` and builds the declaration.
    fn finish_import(&mut self, start: usize, specifiers: Vec<NodeId>) -> Result<NodeId> {
        self.expect_contextual("from")?;
        let source = self.expect_module_specifier()?;
        self.consume_semicolon()?;
        Ok(self.node(NodeKind::ImportDeclaration { specifiers, source }, start))
    }

    /// Parses `name`, `name as local` or `'string' as local`.
    fn parse_import_specifier(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        let is_reference = self.at_binding_identifier();
        let (imported, is_string) = self.parse_module_export_name()?;

        let local = if self.eat_contextual("as") {
            self.expect_binding_identifier()?
        } else if is_reference && !is_string {
            let span = self.previous.span;
            self.ast.alloc(
                NodeKind::Identifier {
                    name: imported.clone(),
                },
                span,
            )
        } else {
            return Err(self.error(format!("Unexpected reserved word '{}'", imported)));
        };

        Ok(self.node(NodeKind::ImportSpecifier { imported, local }, start))
    }

    /// Parses an `export` declaration.
    pub(super) fn parse_export_declaration(&mut self) -> Result<NodeId> {
        let start = self.current.span.start;
        self.advance(); // consume 'export'

        match self.current.kind {
            TokenKind::Star => self.parse_export_all(start),
            TokenKind::Default => self.parse_export_default(start),
            TokenKind::LeftBrace => self.parse_export_list(start),
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let kind = match self.current.kind {
                    TokenKind::Var => VariableKind::Var,
                    TokenKind::Let => VariableKind::Let,
                    _ => VariableKind::Const,
                };
                let declaration = self.parse_variable_declaration(kind)?;
                self.consume_semicolon()?;
                self.export_named(start, declaration)
            }
            TokenKind::Function => {
                let declaration = self.parse_function_declaration(false, NameRule::Required)?;
                self.export_named(start, declaration)
            }
            TokenKind::Async if self.peek_is(&TokenKind::Function) => {
                self.advance();
                let declaration = self.parse_function_declaration(true, NameRule::Required)?;
                self.export_named(start, declaration)
            }
            TokenKind::Class => {
                let declaration = self.parse_class(true, NameRule::Required)?;
                self.export_named(start, declaration)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn export_named(&mut self, start: usize, declaration: NodeId) -> Result<NodeId> {
        Ok(self.node(
            NodeKind::ExportNamedDeclaration {
                declaration: Some(declaration),
                specifiers: Vec::new(),
                source: None,
            },
            start,
        ))
    }

    /// `export * from 'm'` / `export * as name from 'm'`
    fn parse_export_all(&mut self, start: usize) -> Result<NodeId> {
        self.advance(); // consume '*'
        let exported = if self.eat_contextual("as") {
            Some(self.parse_module_export_name()?.0)
        } else {
            None
        };
        self.expect_contextual("from")?;
        let source = self.expect_module_specifier()?;
        self.consume_semicolon()?;
        Ok(self.node(NodeKind::ExportAllDeclaration { exported, source }, start))
    }

    fn parse_export_default(&mut self, start: usize) -> Result<NodeId> {
        self.advance(); // consume 'default'

        let declaration = match self.current.kind {
            TokenKind::Function => self.parse_function_declaration(false, NameRule::Optional)?,
            TokenKind::Async
                if self.peek_is(&TokenKind::Function) && !self.peek_token().newline_before =>
            {
                self.advance();
                self.parse_function_declaration(true, NameRule::Optional)?
            }
            TokenKind::Class => self.parse_class(true, NameRule::Optional)?,
            _ => {
                let expression = self.with_in(true, |p| p.parse_assignment())?;
                self.consume_semicolon()?;
                expression
            }
        };

        Ok(self.node(NodeKind::ExportDefaultDeclaration { declaration }, start))
    }

    /// `export { a, b as c }` with an optional `from 'm'`.
    fn parse_export_list(&mut self, start: usize) -> Result<NodeId> {
        self.advance(); // consume '{'

        let mut specifiers = Vec::new();
        // First local that is not a plain identifier, only legal with `from`
        let mut non_reference = None;
        while !self.check(&TokenKind::RightBrace) {
            let spec_start = self.current.span.start;
            let is_reference = self.at_binding_identifier();
            let (local_name, _) = self.parse_module_export_name()?;
            let local_span = self.previous.span;
            if !is_reference && non_reference.is_none() {
                non_reference = Some(local_name.clone());
            }
            let local = self.ast.alloc(
                NodeKind::Identifier {
                    name: local_name.clone(),
                },
                local_span,
            );
            let exported = if self.eat_contextual("as") {
                self.parse_module_export_name()?.0
            } else {
                local_name
            };
            specifiers.push(self.node(NodeKind::ExportSpecifier { local, exported }, spec_start));

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace)?;

        let source = if self.eat_contextual("from") {
            Some(self.expect_module_specifier()?)
        } else {
            if let Some(name) = non_reference {
                return Err(self.error(format!("Unexpected reserved word '{}'", name)));
            }
            None
        };
        self.consume_semicolon()?;

        Ok(self.node(
            NodeKind::ExportNamedDeclaration {
                declaration: None,
                specifiers,
                source,
            },
            start,
        ))
    }

    /// Parses a ModuleExportName: an IdentifierName or a string literal.
    /// Returns the name and whether it was written as a string.
    fn parse_module_export_name(&mut self) -> Result<(String, bool)> {
        if let TokenKind::String(value) = &self.current.kind {
            let value = value.clone();
            self.advance();
            return Ok((value, true));
        }
        Ok((self.expect_identifier_name()?, false))
    }

    fn expect_module_specifier(&mut self) -> Result<String> {
        match &self.current.kind {
            TokenKind::String(source) => {
                let source = source.clone();
                self.advance();
                Ok(source)
            }
            _ => Err(self.unexpected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{first_stmt, parse_err, parse_ok};
    use crate::ast::{Ast, NodeId, NodeKind};

    fn import_parts(ast: &Ast, stmt: NodeId) -> (Vec<NodeKind>, String) {
        let NodeKind::ImportDeclaration { specifiers, source } = ast.kind(stmt) else {
            panic!("expected import");
        };
        let kinds = specifiers.iter().map(|s| ast.kind(*s).clone()).collect();
        (kinds, source.clone())
    }

    #[test]
    fn test_import_forms() {
        let ast = parse_ok(
            "import 'polyfill';\n\
             import a from './a.js';\n\
             import * as ns from './ns.js';\n\
             import b, { c, d as e, default as f, 'g h' as g } from './b.js';\n\
             import h, * as all from './h.js';",
        );
        let body = ast.program_body().to_vec();
        assert_eq!(body.len(), 5);

        let (specs, source) = import_parts(&ast, body[0]);
        assert!(specs.is_empty());
        assert_eq!(source, "polyfill");

        let (specs, _) = import_parts(&ast, body[1]);
        assert!(matches!(specs[0], NodeKind::ImportDefaultSpecifier { .. }));

        let (specs, _) = import_parts(&ast, body[2]);
        assert!(matches!(specs[0], NodeKind::ImportNamespaceSpecifier { .. }));

        let (specs, source) = import_parts(&ast, body[3]);
        assert_eq!(source, "./b.js");
        assert_eq!(specs.len(), 5);
        let imported: Vec<_> = specs
            .iter()
            .filter_map(|s| match s {
                NodeKind::ImportSpecifier { imported, .. } => Some(imported.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(imported, vec!["c", "d", "default", "g h"]);

        let (specs, _) = import_parts(&ast, body[4]);
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn test_import_specifier_local_is_its_own_node() {
        let ast = parse_ok("import { x } from './x.js';");
        let (specs, _) = import_parts(&ast, ast.program_body()[0]);
        let NodeKind::ImportSpecifier { imported, local } = &specs[0] else {
            panic!("expected specifier");
        };
        assert_eq!(imported, "x");
        assert_eq!(ast.identifier_name(*local), Some("x"));
    }

    #[test]
    fn test_import_keyword_without_alias_is_error() {
        parse_err("import { default } from './a.js';");
    }

    #[test]
    fn test_export_declarations() {
        let ast = parse_ok(
            "export const a = 1, b = 2;\n\
             export function f() {}\n\
             export async function g() {}\n\
             export class C {}\n\
             export { a as x, b };\n\
             export { default, y as 'z' } from './m.js';\n\
             export * from './all.js';\n\
             export * as ns from './ns.js';",
        );
        let body = ast.program_body();
        assert_eq!(body.len(), 8);
        assert!(matches!(
            ast.kind(body[0]),
            NodeKind::ExportNamedDeclaration {
                declaration: Some(_),
                ..
            }
        ));
        let NodeKind::ExportNamedDeclaration {
            specifiers, source, ..
        } = ast.kind(body[5])
        else {
            panic!("expected re-export");
        };
        assert_eq!(source.as_deref(), Some("./m.js"));
        let NodeKind::ExportSpecifier { exported, .. } = ast.kind(specifiers[1]) else {
            panic!("expected specifier");
        };
        assert_eq!(exported, "z");
        assert!(matches!(
            ast.kind(body[6]),
            NodeKind::ExportAllDeclaration { exported: None, .. }
        ));
        assert!(matches!(
            ast.kind(body[7]),
            NodeKind::ExportAllDeclaration { exported: Some(name), .. } if name == "ns"
        ));
    }

    #[test]
    fn test_export_default_forms() {
        let ast = parse_ok(
            "export default function () {}\n\
             export default class Named {}\n\
             export default 1 + 2;",
        );
        let body = ast.program_body();
        let declaration_kind = |stmt: NodeId| {
            let NodeKind::ExportDefaultDeclaration { declaration } = ast.kind(stmt) else {
                panic!("expected default export");
            };
            ast.kind(*declaration).clone()
        };
        assert!(matches!(
            declaration_kind(body[0]),
            NodeKind::FunctionDeclaration(f) if f.id.is_none()
        ));
        assert!(matches!(
            declaration_kind(body[1]),
            NodeKind::ClassDeclaration(c) if c.id.is_some()
        ));
        assert!(matches!(
            declaration_kind(body[2]),
            NodeKind::BinaryExpression { .. }
        ));
    }

    #[test]
    fn test_local_export_of_keyword_is_error() {
        let err = parse_err("export { default };");
        assert!(err.message.contains("default"));
    }

    #[test]
    fn test_export_requires_declaration_name() {
        parse_err("export function () {}");
        parse_err("export class {}");
    }

    #[test]
    fn test_import_call_is_not_declaration() {
        let ast = parse_ok("import('./lazy.js').then(m => m.run());");
        assert!(matches!(
            first_stmt(&ast),
            NodeKind::ExpressionStatement { .. }
        ));
    }
}
