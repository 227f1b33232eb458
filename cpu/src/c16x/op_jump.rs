//! ## Jump, call and stack opcodes
//!
//! - JMPR cc, rel (`cD rr`): [`Cpu::op_jmpr`]
//! - JMPA cc, caddr (`EA c0 MM MM`): [`Cpu::op_jmpa`]
//! - JMPI cc, [Rwn] (`9C cn`): [`Cpu::op_jmpi`]
//! - JMPS seg, caddr (`FA SS MM MM`): [`Cpu::op_jmps`]
//! - CALLR rel (`BB rr`), CALLA cc, caddr (`CA c0 MM MM`),
//!   CALLI cc, [Rwn] (`AB cn`), CALLS seg, caddr (`DA SS MM MM`)
//! - RET (`CB`), RETS (`DB`), RETI (`FB`)
//! - PUSH reg (`EC RR`), POP reg (`FC RR`)
//!
//! Relative displacements count words from the following
//! instruction.
use base::flags::move_flags;
use base::prelude::*;

use super::{Cpu, Execution, Flow, Instruction};
use crate::bus::Bus;

impl Cpu {
    fn branch_if(&mut self, cc: ConditionCode, target: u16) -> Flow {
        if self.evaluate_condition(cc) {
            self.regs.ip = target;
            Flow::Branched
        } else {
            Flow::Next
        }
    }

    fn relative_target(&self, rel: i8) -> u16 {
        self.regs.ip.wrapping_add_signed(i16::from(rel) * 2)
    }

    pub(super) fn op_jmpr(&mut self, inst: &Instruction) -> Execution {
        let cc = ConditionCode::from_field(inst.opcode() >> 4);
        let target = self.relative_target(inst.rel());
        Ok(self.branch_if(cc, target))
    }

    pub(super) fn op_jmpa(&mut self, inst: &Instruction) -> Execution {
        let cc = ConditionCode::from_field(inst.n());
        Ok(self.branch_if(cc, inst.word()))
    }

    pub(super) fn op_jmpi(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let cc = ConditionCode::from_field(inst.n());
        let target = self.read_gpr16(bus, inst.m());
        Ok(self.branch_if(cc, target))
    }

    pub(super) fn op_jmps(&mut self, inst: &Instruction) -> Execution {
        self.regs.csp = u16::from(inst.reg());
        self.regs.ip = inst.word();
        Ok(Flow::Branched)
    }

    fn call(&mut self, bus: &mut Bus, target: u16) -> Flow {
        let ip = self.regs.ip;
        self.push(bus, ip);
        self.regs.ip = target;
        Flow::Branched
    }

    pub(super) fn op_callr(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let target = self.relative_target(inst.rel());
        Ok(self.call(bus, target))
    }

    pub(super) fn op_calla(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        if self.evaluate_condition(ConditionCode::from_field(inst.n())) {
            Ok(self.call(bus, inst.word()))
        } else {
            Ok(Flow::Next)
        }
    }

    pub(super) fn op_calli(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        if self.evaluate_condition(ConditionCode::from_field(inst.n())) {
            let target = self.read_gpr16(bus, inst.m());
            Ok(self.call(bus, target))
        } else {
            Ok(Flow::Next)
        }
    }

    pub(super) fn op_calls(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let csp = self.regs.csp;
        self.push(bus, csp);
        self.regs.csp = u16::from(inst.reg());
        Ok(self.call(bus, inst.word()))
    }

    pub(super) fn op_ret(&mut self, bus: &mut Bus) -> Execution {
        self.regs.ip = self.pop(bus);
        Ok(Flow::Branched)
    }

    pub(super) fn op_rets(&mut self, bus: &mut Bus) -> Execution {
        self.regs.ip = self.pop(bus);
        self.regs.csp = self.pop(bus) & 0xFF;
        Ok(Flow::Branched)
    }

    /// Return from an interrupt handler; the reverse of
    /// [`Cpu::service_interrupt`].
    pub(super) fn op_reti(&mut self, bus: &mut Bus) -> Execution {
        self.regs.ip = self.pop(bus);
        self.regs.csp = self.pop(bus) & 0xFF;
        self.regs.psw = Psw::from_raw(self.pop(bus));
        Ok(Flow::Branched)
    }

    pub(super) fn op_push(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let value = self.read_reg(bus, inst.reg(), Width::Word);
        self.push(bus, value);
        self.apply_flags(move_flags(Width::Word, value));
        Ok(Flow::Next)
    }

    pub(super) fn op_pop(&mut self, bus: &mut Bus, inst: &Instruction) -> Execution {
        let value = self.pop(bus);
        self.write_reg(bus, inst.reg(), Width::Word, value);
        self.apply_flags(move_flags(Width::Word, value));
        Ok(Flow::Next)
    }
}
