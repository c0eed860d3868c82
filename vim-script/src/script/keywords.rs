//! # 关键字表
//!
//! Ex 指令允许缩写：只要写出的部分是完整名称的前缀，且长度不小于最短缩写即可。
//! 例如 `function` 可写作 `fu` ~ `function`，`endfunction` 可写作 `endf` ~ `endfunction`。
//!
//! 关键字用静态表（完整名称 + 最短长度）做前缀比较；其余 Ex 指令沿用
//! `:help ex-cmd-index` 的方括号记法，同样不需要运行时构建。

use serde::{Deserialize, Serialize};

/// 解析器理解其语法的关键字
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Function,
    EndFunction,
    Echo,
    Return,
    Let,
    Call,
    Unlet,
    DelFunction,
}

/// (关键字, 完整名称, 最短缩写长度)
const KEYWORDS: &[(Keyword, &str, usize)] = &[
    (Keyword::Function, "function", 2),
    (Keyword::EndFunction, "endfunction", 4),
    (Keyword::Echo, "echo", 2),
    (Keyword::Return, "return", 4),
    (Keyword::Let, "let", 3),
    (Keyword::Call, "call", 3),
    (Keyword::Unlet, "unlet", 3),
    (Keyword::DelFunction, "delfunction", 4),
];

/// 解释器不处理、但需要识别的 Ex 指令，按 `:help ex-cmd-index` 的记法书写
///
/// `ab[breviate]` 表示必须写出 `ab`，其后可以写出 `breviate` 的任意前缀。
/// 用于区分"函数头下一行的标志"和"函数体里的普通指令"。
const EX_COMMANDS: &str = "\
a[ppend] ab[breviate] abc[lear] abo[veleft] abs[tract] al[l] am[enu] an[oremenu]
ar[gs] arga[dd] argd[elete] argdo arge[dit] argg[lobal] argl[ocal] argu[ment]
as[cii] au[tocmd] aug[roup] aun[menu]
b[uffer] bN[ext] ba[ll] bad[d] balt bd[elete] be[have] bel[owright] bf[irst]
bl[ast] bm[odified] bn[ext] bo[tright] bp[revious] br[ewind] brea[k] breaka[dd]
breakd[el] breakl[ist] bro[wse] bufdo buffers bun[load] bw[ipeout]
c[hange] cN[ext] cNf[ile] ca[bbrev] cabc[lear] cabo[ve] cad[dbuffer]
cadde[xpr] caddf[ile] caf[ter] cat[ch] cb[uffer] cbe[fore] cbel[ow] cbo[ttom]
cc ccl[ose] cd cdo ce[nter] cex[pr] cf[ile] cfdo cfir[st] cg[etfile]
cgetb[uffer] cgete[xpr] changes chd[ir] che[ckpath] checkt[ime] chi[story]
cl[ist] cla[st] class cle[arjumps] clo[se] cm[ap] cmapc[lear] cme[nu] cn[ext]
cnew[er] cnf[ile] cno[remap] cnorea[bbrev] cnoreme[nu] co[py] col[der]
colo[rscheme] com[mand] comc[lear] comp[iler] con[tinue] conf[irm] cons[t]
cope[n] cp[revious] cpf[ile] cq[uit] cr[ewind] cs[cope] cst[ag] cu[nmap]
cuna[bbrev] cunme[nu] cw[indow]
d[elete] deb[ug] debugg[reedy] def defc[ompile] defe[r] delc[ommand]
delm[arks] di[splay] dif[fupdate] diffg[et] diffo[ff] diffp[atch] diffpu[t]
diffs[plit] diffthis dig[raphs] disa[ssemble] dj[ump] dl dli[st] do[autocmd]
doautoa[ll] dp dr[op] ds[earch] dsp[lit]
e[dit] ea[rlier] echoc[onsole] echoe[rr] echoh[l] echom[sg] echon
echow[indow] el[se] elsei[f] em[enu] en[dif] endclass enddef endenum
endfo[r] endinterface endt[ry] endw[hile] ene[w] enum eval ex exe[cute]
exi[t] exp[ort] exu[sage]
f[ile] files filet[ype] filt[er] fin[d] final fina[lly] fini[sh] fir[st]
fix[del] fo[ld] foldc[lose] foldd[oopen] folddoc[losed] foldo[pen] for
g[lobal] go[to] gr[ep] grepa[dd] gu[i] gv[im]
h[elp] ha[rdcopy] helpc[lose] helpf[ind] helpg[rep] helpt[ags] hi[ghlight]
hid[e] his[tory] hor[izontal]
i[nsert] ia[bbrev] iabc[lear] if ij[ump] il[ist] im[ap] imapc[lear] ime[nu]
imp[ort] ino[remap] inorea[bbrev] inoreme[nu] int[ro] interface is[earch]
isp[lit] iu[nmap] iuna[bbrev] iunme[nu]
j[oin] ju[mps]
k kee[pmarks] keepa[lt] keepj[umps] keepp[atterns]
l[ist] lN[ext] lNf[ile] la[st] lab[ove] lad[dexpr] laddb[uffer] laddf[ile]
laf[ter] lan[guage] lat[er] lb[uffer] lbe[fore] lbel[ow] lbo[ttom] lc[d]
lch[dir] lcl[ose] lcs[cope] ld[o] le[ft] lefta[bove] leg[acy] lex[pr] lf[ile]
lfdo lfir[st] lg[etfile] lgetb[uffer] lgete[xpr] lgr[ep] lgrepa[dd]
lh[elpgrep] lhi[story] ll lla[st] lli[st] lm[ap] lmak[e] lmapc[lear] ln[oremap]
lne[xt] lnew[er] lnf[ile] lo[adview] loadk[eymap] loc[kmarks] lockv[ar]
lol[der] lop[en] lp[revious] lpf[ile] lr[ewind] ls lt[ag] lu[nmap] lua luad[o]
luaf[ile] lv[imgrep] lvimgrepa[dd] lw[indow]
m[ove] ma[rk] mak[e] map mapc[lear] marks mat[ch] me[nu] menut[ranslate]
mes[sages] mk[exrc] mks[ession] mksp[ell] mkv[imrc] mkvie[w] mod[e]
mz[scheme] mzf[ile]
n[ext] nb[key] nbc[lose] nbs[tart] new nm[ap] nmapc[lear] nme[nu] nn[oremap]
nnoreme[nu] no[remap] noa[utocmd] noh[lsearch] norea[bbrev] noreme[nu]
norm[al] nos[wapfile] nu[mber] nun[map] nunme[nu]
o[pen] ol[dfiles] om[ap] omapc[lear] ome[nu] on[ly] ono[remap] onoreme[nu]
opt[ions] ou[nmap] ounme[nu] ow[nsyntax]
p[rint] pa[ckadd] packl[oadall] pc[lose] pe[rl] ped[it] perld[o] po[p]
popu[p] pp[op] pre[serve] prev[ious] pro[mptfind] prof[ile] profd[el]
promptr[epl] ps[earch] pt[ag] ptN[ext] ptf[irst] ptj[ump] ptl[ast] ptn[ext]
ptp[revious] ptr[ewind] pts[elect] pu[t] pub[lic] pw[d] py[thon] py3 py3d[o]
py3f[ile] pyd[o] pyf[ile] pyx pyxd[o] pyxf[ile]
q[uit] qa[ll] quita[ll]
r[ead] rec[over] red[o] redi[r] redr[aw] redraws[tatus] redrawt[abline]
reg[isters] res[ize] ret[ab] rew[ind] ri[ght] rightb[elow] ru[ntime] rub[y]
rubyd[o] rubyf[ile] rund[o] rv[iminfo]
s[ubstitute] sN[ext] sa[rgument] sal[l] san[dbox] sav[eas] sb[uffer]
sbN[ext] sba[ll] sbf[irst] sbl[ast] sbm[odified] sbn[ext] sbp[revious]
sbr[ewind] scr[iptnames] scripte[ncoding] scriptv[ersion] scs[cope] se[t]
setf[iletype] setg[lobal] setl[ocal] sf[ind] sfir[st] sh[ell] si[malt]
sig[n] sil[ent] sl[eep] sla[st] sm[agic] sma[p] smapc[lear] sme[nu] sn[ext]
sno[magic] snor[emap] snoreme[nu] so[urce] sor[t] sp[lit] spe[llgood]
spelld[ump] spelli[nfo] spellr[epall] spellra[re] spellu[ndo] spellw[rong]
spr[evious] sre[wind] st[op] sta[g] star[tinsert] startg[replace]
startr[eplace] stat[ic] stj[ump] stopi[nsert] sts[elect] sun[hide] sunm[ap]
sunme[nu] sus[pend] sv[iew] sw[apname] sy[ntax] sync[bind] synti[me]
t tN[ext] tab tabN[ext] tabc[lose] tabd[o] tabe[dit] tabf[ind] tabfir[st]
tabl[ast] tabm[ove] tabn[ext] tabnew tabo[nly] tabp[revious] tabr[ewind]
tabs tc[d] tch[dir] tcl tcld[o] tclf[ile] te[aroff] ter[minal] tf[irst]
th[row] tj[ump] tl[ast] tlm[enu] tln[oremenu] tlu[nmenu] tm[enu] tma[p]
tmapc[lear] tn[ext] tno[remap] to[pleft] tp[revious] tr[ewind] try
ts[elect] tu[nmenu] tunma[p] type
u[ndo] una[bbreviate] undoj[oin] undol[ist] unh[ide] unlo[ckvar] unm[ap]
unme[nu] uns[ilent] up[date]
v[global] var ve[rsion] verb[ose] vert[ical] vi[sual] vie[w] vim[grep]
vim9[cmd] vim9s[cript] vimgrepa[dd] viu[sage] vm[ap] vmapc[lear] vme[nu]
vn[oremap] vne[w] vnoreme[nu] vs[plit] vu[nmap] vunme[nu]
w[rite] wN[ext] wa[ll] wh[ile] wi[nsize] winc[md] windo winp[os] wn[ext]
wp[revious] wq wqa[ll] wu[ndo] wv[iminfo]
x[it] xa[ll] xm[ap] xmapc[lear] xme[nu] xn[oremap] xnoreme[nu] xr[estore]
xu[nmap] xunme[nu]
y[ank]
z";

/// 缩写匹配
fn matches_abbreviation(word: &str, canonical: &str, min_len: usize) -> bool {
    word.len() >= min_len && canonical.starts_with(word)
}

/// 按 [`EX_COMMANDS`] 的记法匹配
fn matches_notation(word: &str, notation: &str) -> bool {
    let (head, tail) = match notation.split_once('[') {
        Some((head, tail)) => (head, tail.trim_end_matches(']')),
        None => (notation, ""),
    };
    match word.strip_prefix(head) {
        Some(rest) => tail.starts_with(rest),
        None => false,
    }
}

impl Keyword {
    /// 查找关键字（区分大小写）
    pub fn lookup(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(_, canonical, min_len)| matches_abbreviation(word, canonical, *min_len))
            .map(|(keyword, _, _)| *keyword)
    }

    /// 完整名称
    pub fn canonical(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(keyword, _, _)| *keyword == self)
            .map(|(_, canonical, _)| *canonical)
            .unwrap_or_default()
    }
}

/// 是否是已知的 Ex 指令（关键字或 [`EX_COMMANDS`] 中的指令），区分大小写
pub fn is_known_command(word: &str) -> bool {
    Keyword::lookup(word).is_some()
        || EX_COMMANDS
            .split_whitespace()
            .any(|notation| matches_notation(word, notation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_abbreviations() {
        for word in ["fu", "fun", "func", "funct", "functi", "functio", "function"] {
            assert_eq!(Keyword::lookup(word), Some(Keyword::Function), "{word}");
        }
        for word in ["f", "functions", "fn", "Function", "FU"] {
            assert_ne!(Keyword::lookup(word), Some(Keyword::Function), "{word}");
        }
    }

    #[test]
    fn test_endfunction_abbreviations() {
        for word in [
            "endf",
            "endfu",
            "endfun",
            "endfunc",
            "endfunct",
            "endfuncti",
            "endfunctio",
            "endfunction",
        ] {
            assert_eq!(Keyword::lookup(word), Some(Keyword::EndFunction), "{word}");
        }
        for word in ["end", "endfo", "endfor", "endfunctions", "endif"] {
            assert_eq!(Keyword::lookup(word), None, "{word}");
        }
    }

    #[test]
    fn test_other_keywords() {
        assert_eq!(Keyword::lookup("ec"), Some(Keyword::Echo));
        assert_eq!(Keyword::lookup("e"), None);
        assert_eq!(Keyword::lookup("retu"), Some(Keyword::Return));
        assert_eq!(Keyword::lookup("ret"), None);
        assert_eq!(Keyword::lookup("cal"), Some(Keyword::Call));
        assert_eq!(Keyword::lookup("delf"), Some(Keyword::DelFunction));
        assert_eq!(Keyword::lookup("unl"), Some(Keyword::Unlet));
        assert_eq!(Keyword::Function.canonical(), "function");
    }

    #[test]
    fn test_known_commands() {
        assert!(is_known_command("set"));
        assert!(is_known_command("se"));
        assert!(is_known_command("nnoremap"));
        assert!(is_known_command("norm"));
        assert!(is_known_command("echo"));
        assert!(is_known_command("wincmd"));
        assert!(is_known_command("winc"));
        assert!(is_known_command("stopinsert"));
        assert!(is_known_command("stopi"));
        assert!(is_known_command("close"));
        assert!(is_known_command("clo"));
        assert!(is_known_command("tabnew"));
        assert!(!is_known_command("wincmds"));
        assert!(!is_known_command("stopinserts"));
        assert!(!is_known_command("closed"));
        assert!(!is_known_command("Close"));
        assert!(!is_known_command("badflag"));
        assert!(!is_known_command("range"));
        assert!(!is_known_command("abort"));
        assert!(!is_known_command("dict"));
        assert!(!is_known_command("closure"));
    }

    #[test]
    fn test_notation_matching() {
        assert!(matches_notation("a", "a[ppend]"));
        assert!(matches_notation("appe", "a[ppend]"));
        assert!(matches_notation("append", "a[ppend]"));
        assert!(!matches_notation("appendx", "a[ppend]"));
        assert!(!matches_notation("ax", "a[ppend]"));
        assert!(matches_notation("tabnew", "tabnew"));
        assert!(!matches_notation("tabne", "tabnew"));
    }
}
