use std::collections::HashMap;

use crate::{
    error::{DiagnosticKind, SemanticError},
    types::{FieldType, FileDesc, MessageDesc},
};

/// Check the relationships between declarations once the whole file has
/// been read. Returns each problem with the line it belongs to.
pub fn verify_file(file: &FileDesc) -> Vec<(usize, DiagnosticKind)> {
    let mut found = Vec::new();

    // 1) Every message-typed field refers to another declared message
    for message in &file.messages {
        for field in &message.fields {
            let FieldType::Message(ty) = &field.ty else { continue };
            if *ty == message.name {
                found.push((
                    field.line,
                    SemanticError::SelfReference {
                        message: message.name.clone(),
                        field:   field.name.clone(),
                    }
                    .into(),
                ));
            } else if file.get_message(ty).is_none() {
                found.push((
                    field.line,
                    SemanticError::UnresolvedType {
                        message: message.name.clone(),
                        field:   field.name.clone(),
                        ty:      ty.clone(),
                    }
                    .into(),
                ));
            }
        }
    }

    // 2) Method request and reply types are declared messages
    for rpc in &file.rpcs {
        for method in &rpc.methods {
            for ty in [&method.request, &method.reply] {
                if file.get_message(ty).is_none() {
                    found.push((
                        method.line,
                        DiagnosticKind::UnresolvedMethodType {
                            rpc:    rpc.name.clone(),
                            method: method.name.clone(),
                            ty:     ty.clone(),
                        },
                    ));
                }
            }
        }
    }

    // 3) Messages do not contain themselves through other messages
    let mut state: HashMap<&str, u8> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();
    for message in &file.messages {
        if let Err((line, err)) = check_recursion(file, message, &mut state, &mut stack) {
            found.push((line, err.into()));
            break;
        }
    }

    // 4) Sizes fit in a usize
    if found.is_empty() {
        for message in &file.messages {
            if let Err(err) = file.max_size(&message.name) {
                found.push((message.line, err.into()));
                break;
            }
        }
    }

    found
}

/// Depth-first walk over message-typed fields. `state` marks a message 1
/// while it is on `stack` and 2 once all of its fields are done.
fn check_recursion<'f>(
    file: &'f FileDesc,
    message: &'f MessageDesc,
    state: &mut HashMap<&'f str, u8>,
    stack: &mut Vec<&'f str>,
) -> Result<(), (usize, SemanticError)> {
    if state.get(message.name.as_str()) == Some(&2) {
        return Ok(());
    }
    state.insert(&message.name, 1);
    stack.push(&message.name);

    for field in &message.fields {
        let FieldType::Message(ty) = &field.ty else { continue };
        // Direct self references and unknown types are reported on their own.
        if *ty == message.name {
            continue;
        }
        let Some(next) = file.get_message(ty) else { continue };
        if state.get(ty.as_str()) == Some(&1) {
            let start = stack.iter().position(|name| name == ty).unwrap_or(0);
            let mut path: Vec<String> = stack[start..].iter().map(|name| name.to_string()).collect();
            path.push(ty.clone());
            return Err((field.line, SemanticError::TypeCycle { path }));
        }
        check_recursion(file, next, state, stack)?;
    }

    stack.pop();
    state.insert(&message.name, 2);
    Ok(())
}
