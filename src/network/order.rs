//! Iterative three-mark depth-first ordering.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Orders nodes so that every node comes after all of its predecessors.
///
/// `predecessors[n]` lists the nodes that must precede `n`. Roots are
/// visited in the given order and predecessors in list order, which makes
/// the result deterministic and keeps unrelated nodes in root order.
///
/// # Errors
/// Returns the in-progress nodes forming a cycle, from the first visit of
/// the closing node to the point it was reached again, with the closing
/// node appended.
pub(crate) fn depth_first_order(
    roots: impl IntoIterator<Item = usize>,
    predecessors: &[Vec<usize>],
) -> Result<Vec<usize>, Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; predecessors.len()];
    let mut order = Vec::with_capacity(predecessors.len());
    // (node, next predecessor to look at)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in roots {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let Some(&pred) = predecessors[node].get(top.1) else {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
                continue;
            };
            top.1 += 1;

            match marks[pred] {
                Mark::Unvisited => {
                    marks[pred] = Mark::InProgress;
                    stack.push((pred, 0));
                }
                Mark::InProgress => {
                    let from = stack.iter().position(|&(n, _)| n == pred).unwrap_or(0);
                    let mut cycle: Vec<usize> = stack[from..].iter().map(|&(n, _)| n).collect();
                    cycle.push(pred);
                    return Err(cycle);
                }
                Mark::Done => {}
            }
        }
    }

    Ok(order)
}
