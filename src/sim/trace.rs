//! 流量 trace 读取
//!
//! 每行 7 个逗号分隔字段：`id,src,dst,sport,dport,size_pkts,start_timeslot`。
//! 第一行是表头，直接跳过。按需逐行读取，不会一次性读入整个文件。

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{Result, SimError};
use crate::net::HostAddr;

use super::time::Timeslot;

/// trace 中的一条流
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRow {
    pub id: u64,
    pub src: HostAddr,
    pub dst: HostAddr,
    pub sport: u32,
    pub dport: u32,
    /// 流大小（包）
    pub size: u64,
    pub start: Timeslot,
}

pub struct FlowTrace<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl FlowTrace<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> FlowTrace<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for FlowTrace<R> {
    type Item = Result<FlowRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if self.line_no == 1 || line.trim().is_empty() {
                continue;
            }
            return Some(parse_row(&line, self.line_no));
        }
    }
}

/// 解析一行 trace
pub fn parse_row(line: &str, line_no: usize) -> Result<FlowRow> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 7 {
        return Err(SimError::Trace {
            line: line_no,
            reason: format!("expected 7 fields, found {}", fields.len()),
        });
    }

    let bad = |what: &str, raw: &str| SimError::Trace {
        line: line_no,
        reason: format!("bad {what} `{raw}`"),
    };
    let int = |what: &str, raw: &str| raw.parse::<u64>().map_err(|_| bad(what, raw));

    let id = int("flow id", fields[0])?;
    let src: HostAddr = fields[1].parse().map_err(|_| bad("source address", fields[1]))?;
    let dst: HostAddr = fields[2].parse().map_err(|_| bad("destination address", fields[2]))?;
    let sport = fields[3].parse::<u32>().map_err(|_| bad("source port", fields[3]))?;
    let dport = fields[4].parse::<u32>().map_err(|_| bad("destination port", fields[4]))?;
    let size = int("flow size", fields[5])?;
    let start = Timeslot(int("start timeslot", fields[6])?);

    if size == 0 {
        return Err(bad("flow size", fields[5]));
    }

    Ok(FlowRow {
        id,
        src,
        dst,
        sport,
        dport,
        size,
        start,
    })
}
