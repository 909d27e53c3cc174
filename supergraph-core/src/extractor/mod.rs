//! Two-pass structural extraction over the neutral syntax tree.
//!
//! Pass 1 parses every file and records every declared type, nested ones
//! included, in a [`TypeIndex`]. Pass 2 walks the cached units again and
//! emits records and resolved dependency edges. The index is complete before
//! any file enters pass 2, because resolution needs types declared in files
//! that come later in scan order.

use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::assembler::GraphAssembler;
use crate::error::{Result, SupergraphError};
use crate::parser::helpers::normalize_whitespace;
use crate::parser::{
    self, Backend, FieldDecl, FileInfo, MethodDecl, ParseOutcome, SourceUnit, SyntaxNode, TypeDecl,
};
use crate::pipeline::CancellationFlag;
use crate::scanner::{content_hash, ScanResult};
use crate::types::{
    method_signature, DependencyEdge, DependencyVia, FieldRecord, MethodRecord, ParamDef,
    ProjectGraph, ResolutionStats, TypeRecord,
};

pub mod resolve;

pub use resolve::{resolve_type_reference, Resolution, TypeIndex, UnresolvedReason};

/// One file after pass 1.
#[derive(Clone, Debug)]
pub struct ParsedFile {
    pub path: String,
    pub file_hash: String,
    pub outcome: ParseOutcome,
}

/// Per-project cache of parsed units plus the discovery index.
#[derive(Debug, Default)]
pub struct ParseContext {
    pub files: Vec<ParsedFile>,
    pub index: TypeIndex,
}

impl ParseContext {
    pub fn parse_error_count(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_degraded()).count()
    }
}

/// Records emitted for one file in pass 2.
#[derive(Clone, Debug, Default)]
pub struct FileExtraction {
    pub path: String,
    pub backend: Option<Backend>,
    pub degraded: bool,
    pub types: Vec<TypeRecord>,
    pub methods: Vec<MethodRecord>,
    pub fields: Vec<FieldRecord>,
    pub dependencies: Vec<DependencyEdge>,
    pub extends: Vec<(String, String)>,
    pub implements: Vec<(String, String)>,
    pub resolution: ResolutionStats,
}

impl FileExtraction {
    fn push_dependency(&mut self, from: &str, to: &str, via: DependencyVia) {
        if from == to {
            return;
        }
        self.dependencies.push(DependencyEdge {
            from_fqn: from.to_string(),
            to_fqn: to.to_string(),
            via,
            file: self.path.clone(),
        });
    }
}

/// Fqn of a declaration: `pkg.Name` at top level, `Outer$Name` when nested.
pub fn qualify(package: &str, outer: Option<&str>, name: &str) -> String {
    match outer {
        Some(outer) => format!("{}${}", outer, name),
        None if package.is_empty() => name.to_string(),
        None => format!("{}.{}", package, name),
    }
}

/// Depth-first visit of every named type declaration in a unit, with its fqn
/// and whether it sits at file top level.
pub fn visit_types<'a, F>(unit: &'a SourceUnit, visit: &mut F)
where
    F: FnMut(&'a TypeDecl, &str, bool),
{
    visit_nodes(&unit.nodes, unit.package_prefix(), None, visit);
}

fn visit_nodes<'a, F>(nodes: &'a [SyntaxNode], package: &str, outer: Option<&str>, visit: &mut F)
where
    F: FnMut(&'a TypeDecl, &str, bool),
{
    for node in nodes {
        match node {
            SyntaxNode::TypeDecl(decl) if !decl.name.is_empty() => {
                let fqn = qualify(package, outer, &decl.name);
                visit(decl, &fqn, outer.is_none());
                visit_nodes(&decl.members, package, Some(fqn.as_str()), visit);
            }
            SyntaxNode::Generic { children } => visit_nodes(children, package, outer, visit),
            SyntaxNode::TypeDecl(_) | SyntaxNode::MethodDecl(_) | SyntaxNode::FieldDecl(_) => {}
        }
    }
}

/// Methods and fields owned directly by a type, looking through generic
/// containers but not into nested types.
fn direct_members<'a>(
    nodes: &'a [SyntaxNode],
    methods: &mut Vec<&'a MethodDecl>,
    fields: &mut Vec<&'a FieldDecl>,
) {
    for node in nodes {
        match node {
            SyntaxNode::MethodDecl(method) => methods.push(method),
            SyntaxNode::FieldDecl(field) => fields.push(field),
            SyntaxNode::Generic { children } => direct_members(children, methods, fields),
            SyntaxNode::TypeDecl(_) => {}
        }
    }
}

/// Pass 1: read and parse every scanned file, then build the type index.
///
/// Files that cannot be read are kept as degraded outcomes so they count as
/// parse errors. The scan hash is reused when the scan computed one.
pub fn discover(root: &Path, scan: &ScanResult, cancel: &CancellationFlag) -> Result<ParseContext> {
    cancel.check()?;

    let read: Vec<(FileInfo, String, Option<String>)> = scan
        .files
        .par_iter()
        .map(|file| match fs::read(root.join(&file.path)) {
            Ok(bytes) => {
                let hash = file.hash.clone().unwrap_or_else(|| content_hash(&bytes));
                let info = FileInfo {
                    path: file.path.clone(),
                    source: String::from_utf8_lossy(&bytes).into_owned(),
                };
                (info, hash, None)
            }
            Err(e) => {
                let err = SupergraphError::FileParse {
                    path: file.path.clone(),
                    message: format!("cannot read file: {}", e),
                };
                warn!("{}", err);
                let info = FileInfo {
                    path: file.path.clone(),
                    source: String::new(),
                };
                (info, file.hash.clone().unwrap_or_default(), Some(err.to_string()))
            }
        })
        .collect();
    cancel.check()?;

    let (infos, meta): (Vec<FileInfo>, Vec<(String, Option<String>)>) = read
        .into_iter()
        .map(|(info, hash, read_error)| (info, (hash, read_error)))
        .unzip();
    let outcomes = parser::parse_files_parallel(&infos);
    cancel.check()?;

    // barrier: the index is built only once every file has been parsed
    let mut index = TypeIndex::new();
    let files: Vec<ParsedFile> = infos
        .into_iter()
        .zip(meta)
        .zip(outcomes)
        .map(|((info, (file_hash, read_error)), outcome)| {
            let outcome = match read_error {
                Some(error) => ParseOutcome::failed(error),
                None => outcome,
            };
            visit_types(&outcome.unit, &mut |decl, fqn, _| index.insert(fqn, &decl.name));
            ParsedFile {
                path: info.path,
                file_hash,
                outcome,
            }
        })
        .collect();

    debug!("Discovered {} internal types", index.len());
    Ok(ParseContext { files, index })
}

/// Pass 2: emit records for every parsed file against the finished index.
pub fn extract(ctx: &ParseContext, cancel: &CancellationFlag) -> Result<Vec<FileExtraction>> {
    let extractions: Vec<Option<FileExtraction>> = ctx
        .files
        .par_iter()
        .map(|file| {
            if cancel.is_cancelled() {
                None
            } else {
                Some(extract_file(file, &ctx.index))
            }
        })
        .collect();

    extractions
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(SupergraphError::Cancelled)
}

/// Run both passes and assemble the project graph.
pub fn extract_project(
    root: &Path,
    scan: &ScanResult,
    project: &str,
    repo: &str,
    cancel: &CancellationFlag,
) -> Result<ProjectGraph> {
    let ctx = discover(root, scan, cancel)?;
    let extractions = extract(&ctx, cancel)?;

    let mut assembler = GraphAssembler::new(project, repo, Backend::TreeSitter);
    for extraction in extractions {
        assembler.add(extraction);
    }
    let graph = assembler.finish();

    info!(
        "Extracted {}/{}: {} types, {} methods, {} fields, {} dependencies ({} parse errors)",
        project,
        repo,
        graph.types.len(),
        graph.methods.len(),
        graph.fields.len(),
        graph.dependencies.len(),
        graph.stats.parse_error_count
    );
    Ok(graph)
}

/// Emit the records of one parsed file.
pub fn extract_file(file: &ParsedFile, index: &TypeIndex) -> FileExtraction {
    let mut out = FileExtraction {
        path: file.path.clone(),
        backend: Some(file.outcome.backend),
        degraded: file.outcome.is_degraded(),
        ..Default::default()
    };
    let unit = &file.outcome.unit;

    let mut import_targets = Vec::new();
    for import in &unit.imports {
        match index.resolve_import(import) {
            Resolution::Resolved(fqn) => {
                out.resolution.imports_resolved += 1;
                import_targets.push(fqn);
            }
            Resolution::Unresolved(reason) => {
                out.resolution.imports_unresolved += 1;
                debug!("{}: unresolved import {} ({:?})", file.path, import.path, reason);
            }
        }
    }

    visit_types(unit, &mut |decl, fqn, top_level| {
        out.types.push(TypeRecord {
            fqn: fqn.to_string(),
            name: decl.name.clone(),
            file: file.path.clone(),
            file_hash: file.file_hash.clone(),
        });
        for reference in &decl.extends {
            out.extends.push((fqn.to_string(), reference.clone()));
        }
        for reference in &decl.implements {
            out.implements.push((fqn.to_string(), reference.clone()));
        }

        if top_level {
            for target in &import_targets {
                out.push_dependency(fqn, target, DependencyVia::Import);
            }
        }

        let mut methods = Vec::new();
        let mut fields = Vec::new();
        direct_members(&decl.members, &mut methods, &mut fields);

        for method in methods {
            out.methods.push(method_record(method, fqn, &file.path));
        }

        for field in fields {
            let type_name = field.type_name.clone().unwrap_or_else(|| "?".to_string());
            for name in &field.names {
                out.fields.push(FieldRecord {
                    owner_fqn: fqn.to_string(),
                    name: name.clone(),
                    type_name: type_name.clone(),
                    modifiers: field.modifiers.clone(),
                });
            }
            match index.resolve_field_type(&type_name) {
                Resolution::Resolved(target) => {
                    out.resolution.field_types_resolved += 1;
                    out.push_dependency(fqn, &target, DependencyVia::Field);
                }
                Resolution::Unresolved(_) => out.resolution.field_types_unresolved += 1,
            }
        }
    });

    out
}

fn method_record(method: &MethodDecl, owner_fqn: &str, file: &str) -> MethodRecord {
    let params: Vec<ParamDef> = method
        .params
        .iter()
        .map(|p| {
            let type_name = if p.type_name.is_empty() {
                "?"
            } else {
                p.type_name.as_str()
            };
            ParamDef::new(p.name.clone(), type_name)
        })
        .collect();
    let param_types: Vec<&str> = params.iter().map(|p| p.type_name.as_str()).collect();

    MethodRecord {
        owner_fqn: owner_fqn.to_string(),
        name: method.name.clone(),
        signature: method_signature(&method.name, &param_types),
        return_type: method
            .return_type
            .clone()
            .unwrap_or_else(|| "void".to_string()),
        modifiers: method.modifiers.clone(),
        file: Some(file.to_string()),
        begin_line: Some(method.start_line),
        end_line: Some(method.end_line),
        body_hash: method
            .body
            .as_ref()
            .map(|body| content_hash(normalize_whitespace(body).as_bytes())),
        params,
    }
}
