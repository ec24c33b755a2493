//! Semicolon-delimited CSV writer.
//!
//! One header row, then one row per response. Columns follow the shape:
//! identity, submission time, address, one per active category, comment,
//! moderation status and moderation time. Groups the shape does not carry are
//! left out; a category a response was never rated on is an empty cell.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use poll_core::{
  response::Response,
  schema::{Shape, field},
};

use crate::{ExportOptions, Result};

fn header(shape: &Shape) -> Vec<&str> {
  let mut columns = vec![field::ID, field::SUBMITTED_AT];
  if shape.has_address() {
    columns.push(field::ADDRESS);
  }
  columns.extend(shape.categories().iter().map(String::as_str));
  if shape.has_comment() {
    columns.push(field::COMMENT);
  }
  if shape.has_moderation() {
    columns.push(field::MODERATION);
    columns.push(field::MODERATED_AT);
  }
  columns
}

fn row(response: &Response, shape: &Shape, options: &ExportOptions) -> Vec<String> {
  let mut cells = vec![
    response.id.to_string(),
    options.format_timestamp(response.submitted_at),
  ];
  if shape.has_address() {
    cells.push(response.address.clone().unwrap_or_default());
  }
  cells.extend(shape.categories().iter().map(|c| {
    response
      .rating(c)
      .map(|r| r.get().to_string())
      .unwrap_or_default()
  }));
  if shape.has_comment() {
    cells.push(response.comment.clone().unwrap_or_default());
  }
  if shape.has_moderation() {
    cells.push(response.moderation.status().to_string());
    cells.push(
      response
        .moderation
        .moderated_at()
        .map(|at| options.format_timestamp(at))
        .unwrap_or_default(),
    );
  }
  cells
}

pub(crate) fn write(
  responses: &[Response],
  shape: &Shape,
  options: &ExportOptions,
) -> Result<Vec<u8>> {
  let mut wtr = WriterBuilder::new()
    .delimiter(b';')
    .quote_style(QuoteStyle::Necessary)
    .terminator(Terminator::CRLF)
    .from_writer(Vec::new());

  wtr.write_record(header(shape))?;
  for response in responses {
    wtr.write_record(row(response, shape, options))?;
  }

  wtr.into_inner().map_err(|e| e.into_error().into())
}
